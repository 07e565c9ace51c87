use anyhow::{Context, Result, bail};
use clap::Args;
use usm_demux::Demuxer;

/// Mask key, either as one 64-bit value or as its two 32-bit halves.
#[derive(Args, Clone, Debug)]
pub struct KeyArgs {
    /// 64-bit key in decimal or 0x-prefixed hex.
    /// The low 32 bits are key one and the high 32 bits key two.
    #[arg(short, long, env = "USM_KEY", value_parser = parse_key, conflicts_with_all = ["key1", "key2"])]
    key: Option<u64>,

    /// Lower half of the key.
    #[arg(long, value_parser = parse_half, requires = "key2")]
    key1: Option<u32>,

    /// Upper half of the key.
    #[arg(long, value_parser = parse_half, requires = "key1")]
    key2: Option<u32>,
}

impl KeyArgs {
    pub fn demuxer(&self) -> Result<Demuxer> {
        match (self.key, self.key1, self.key2) {
            (Some(key), _, _) => Ok(Demuxer::from_key(key)),
            (None, Some(key1), Some(key2)) => Ok(Demuxer::new(key1, key2)),
            _ => bail!("A key is required, use --key (or USM_KEY) or --key1 with --key2."),
        }
    }
}

/// Parse a `0x`-prefixed hex or decimal key. Underscores are ignored.
pub fn parse_key(value: &str) -> Result<u64> {
    let value = value.trim().replace('_', "");

    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };

    parsed.with_context(|| format!("'{}' is not a valid decimal or 0x hex key.", value))
}

pub fn parse_half(value: &str) -> Result<u32> {
    let key = parse_key(value)?;
    u32::try_from(key).with_context(|| format!("{:#x} does not fit in 32 bits.", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimal_and_hex() {
        assert_eq!(parse_key("20919248762").unwrap(), 20919248762);
        assert_eq!(
            parse_key("0x00004533_0B2B2A79").unwrap(),
            0x0000_4533_0B2B_2A79
        );
        assert_eq!(parse_half("0XCAFEBABE").unwrap(), 0xCAFE_BABE);
        assert_eq!(parse_half(" 7 ").unwrap(), 7);
    }

    #[test]
    fn reject_invalid_keys() {
        assert!(parse_key("").is_err());
        assert!(parse_key("0x").is_err());
        assert!(parse_key("-1").is_err());
        assert!(parse_key("0xGG").is_err());
        assert!(parse_half("0x1_0000_0000").is_err());
    }

    #[test]
    fn key_halves() {
        let whole = KeyArgs {
            key: Some(0x0000_4533_0B2B_2A79),
            key1: None,
            key2: None,
        };
        let halves = KeyArgs {
            key: None,
            key1: Some(0x0B2B_2A79),
            key2: Some(0x0000_4533),
        };

        assert_eq!(
            whole.demuxer().unwrap().masks(),
            halves.demuxer().unwrap().masks()
        );
    }

    #[test]
    fn missing_key() {
        let none = KeyArgs {
            key: None,
            key1: None,
            key2: None,
        };

        assert!(none.demuxer().is_err());
    }
}
