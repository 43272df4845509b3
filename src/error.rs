//! Error taxonomy for the BZIP2 engine.
//!
//! Every error raised while a session is running is terminal for that session. Block-structured
//! compressed data has no safe resynchronization point, so nothing here is retried.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BzError {
    /// Fewer bits remained in the input than the format required.
    #[error("truncated stream: {0}")]
    TruncatedStream(String),

    /// The MTF/RLE2 symbol stream (or the data it expands to) does not describe a valid block.
    #[error("malformed block: {0}")]
    MalformedBlock(String),

    /// Code lengths read from the stream do not form a usable canonical prefix code.
    #[error("invalid huffman table: {0}")]
    InvalidHuffmanTable(String),

    /// A magic number, header field or other structural element did not match the container format.
    #[error("corrupt frame: {0}")]
    CorruptFrame(String),

    /// A block or stream CRC did not match the decoded data.
    #[error("data integrity failure: expected crc {expected:#010x}, found {found:#010x}")]
    DataIntegrity { expected: u32, found: u32 },

    /// Rejected configuration, reported by `open` before any data is consumed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The session already finished, was closed, or failed earlier.
    #[error("session is closed")]
    SessionClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BzError>;

impl From<BzError> for std::io::Error {
    fn from(err: BzError) -> Self {
        match err {
            BzError::Io(e) => e,
            BzError::Config(_) => std::io::Error::new(std::io::ErrorKind::InvalidInput, err),
            BzError::TruncatedStream(_) => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, err)
            }
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}
