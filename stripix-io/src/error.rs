//! I/O error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A data file could not be framed.
    #[error("invalid data file {}: {source}", path.display())]
    Format {
        path: PathBuf,
        source: stripix_trb::Error,
    },

    /// A calibration file held no usable rows or does not fit the data.
    #[error("invalid calibration file {}: {reason}", path.display())]
    Calibration { path: PathBuf, reason: String },

    /// Malformed JSON configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The UDP socket could not be opened or the worker failed.
    #[error("socket error on {addr}: {source}")]
    Socket {
        addr: String,
        source: std::io::Error,
    },

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] stripix_core::Error),
}
