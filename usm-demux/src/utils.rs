/// Replace characters that are not valid in a file name on common filesystems
/// with `_` and trim surrounding whitespace. `None` becomes an empty string.
///
/// The Windows set of invalid characters is used everywhere, so the same
/// container produces the same names on every host.
pub fn sanitize_filename(name: Option<&str>) -> String {
    let Some(name) = name else {
        return String::new();
    };

    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_ascii_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_owned()
}
