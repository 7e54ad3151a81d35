//! miniTRB format error types.

use thiserror::Error;

/// Result type for miniTRB decoding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal framing errors for a data file.
///
/// Running out of complete events is not an error; see
/// [`Truncation`](crate::events::Truncation).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A sentinel byte pair was not found before the end of the data.
    #[error("{sentinel} sentinel not found in {scanned_bytes} bytes")]
    SentinelNotFound {
        sentinel: &'static str,
        scanned_bytes: usize,
    },

    /// The data-kind byte does not announce raw data.
    #[error("unsupported data format at offset {offset}: kind {kind:?} is not raw (0xa0)")]
    UnsupportedFormat { kind: Option<u8>, offset: usize },

    /// The version word is not a known hardware revision.
    #[error("unknown hardware version {marker:#06x} at offset {offset}")]
    UnknownHardwareVersion { marker: u16, offset: usize },

    /// The header lies too close to a boundary to hold the version word.
    #[error("file header truncated: no version word at offset {offset:?}")]
    HeaderTruncated { offset: Option<usize> },
}
