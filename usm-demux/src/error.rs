//! Error types for container demuxing.

use thiserror::Error;

/// Errors that can occur while reading a container or writing its streams.
#[derive(Debug, Error)]
pub enum Error {
    /// The first sector of the input is not a `CRID` sector (this includes empty input).
    #[error("invalid container: {}", container_reason(.found))]
    InvalidContainer { found: Option<u32> },

    /// A sector header is structurally unusable.
    #[error("malformed sector header at offset {offset}: {reason}")]
    MalformedHeader { offset: u64, reason: String },

    /// A metadata table does not start with the `@UTF` magic.
    #[error("invalid metadata table signature: expected {expected:#010x}, found {found:#010x}")]
    InvalidSignature { expected: u32, found: u32 },

    /// A metadata table declares more bytes than it contains.
    #[error(
        "truncated metadata table: {context} needs {needed} bytes at offset {offset} but only {available} are available"
    )]
    TruncatedTable {
        context: &'static str,
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// The input ended inside a sector.
    #[error("truncated stream: {context} needs {needed} bytes at offset {offset} but only {found} were read")]
    TruncatedStream {
        context: &'static str,
        offset: u64,
        needed: u64,
        found: u64,
    },

    /// A metadata column carries a type tag outside the known set.
    #[error("unknown metadata element type tag {0:#04x}")]
    UnknownElementType(u8),

    /// A metadata row lacks a field needed to classify it.
    #[error("metadata row {row} has no usable `{field}` field")]
    MissingRequiredField { row: usize, field: &'static str },

    /// Stream data and announced stream names do not line up.
    #[error("stream sequence error: {0}")]
    StreamSequenceError(String),

    /// I/O error from the input or an output sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn container_reason(found: &Option<u32>) -> String {
    match found {
        Some(signature) => format!("first sector signature is {signature:#010x}, expected CRID"),
        None => "input is empty".to_owned(),
    }
}

impl Error {
    pub(crate) fn table_truncated(
        context: &'static str,
        offset: u64,
        needed: u64,
        available: u64,
    ) -> Self {
        Self::TruncatedTable {
            context,
            offset,
            needed,
            available,
        }
    }
}

/// Result type for demuxing operations.
pub type Result<T> = std::result::Result<T, Error>;
