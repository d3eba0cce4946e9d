//! The error type shared by every layer of the codec.

use thiserror::Error;

/// Errors reported by the bitstream, the block codec, the framer and the
/// streaming sessions. Low-level errors travel up unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A value does not fit the requested width or buffer.
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// The input ended before a complete item could be read.
    #[error("input truncated: {0}")]
    Truncated(String),

    /// The compressed data is internally inconsistent.
    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    /// The caller passed a parameter outside of the supported bounds.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The container structure (magic, version, flags, sizes) is invalid.
    #[error("format error at byte {offset}: {msg}")]
    FormatError { offset: usize, msg: String },

    /// A stored checksum does not match the data it protects.
    #[error(
        "checksum mismatch at byte {offset}: expected {expected:#x}, got {actual:#x}"
    )]
    ChecksumMismatch {
        offset: usize,
        expected: u64,
        actual: u64,
    },

    /// An operation was called in the wrong order.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The session was finished or aborted.
    #[error("session closed")]
    SessionClosed,

    /// The stream needs more memory than the decoder is allowed to use.
    #[error("memory limit exceeded: need {needed} bytes, limit is {limit}")]
    MemoryLimit { needed: usize, limit: usize },
}

impl Error {
    /// Returns true for errors that leave a decoder unable to continue.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::InvalidParameter(_)
                | Error::InvalidState(_)
                | Error::SessionClosed
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand for building a `CorruptStream` error.
pub(crate) fn corrupt<T>(msg: impl Into<String>) -> Result<T> {
    Err(Error::CorruptStream(msg.into()))
}

/// Shorthand for building a `Truncated` error.
pub(crate) fn truncated<T>(msg: impl Into<String>) -> Result<T> {
    Err(Error::Truncated(msg.into()))
}
