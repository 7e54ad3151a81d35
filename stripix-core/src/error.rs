//! Error types for stripix-core.

use thiserror::Error;

/// Result type alias for stripix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for stripix operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unrecognized hardware version marker.
    #[error("unknown hardware version marker: {0:#06x}")]
    UnknownHardwareVersion(u16),

    /// Event length does not match the hardware channel count.
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },

    /// Requested calibration group is not present in the table.
    #[error("calibration group {0} not found")]
    MissingCalibrationGroup(usize),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
