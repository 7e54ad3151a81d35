//! stripix-core: Core types for miniTRB microstrip data processing.
//!
//! This crate provides the data model shared by the decoders, the signal
//! algorithms and the I/O layer: hardware versions, raw and corrected
//! events, calibration tables, clustering configuration and cluster records.
//!

pub mod calibration;
pub mod cluster;
pub mod clustering;
pub mod error;
pub mod event;

pub use calibration::{CalibrationGroup, CalibrationTable, ChannelCalibration, Correction};
pub use cluster::{Cluster, ClusterTable};
pub use clustering::{ClusteringConfig, CommonModeConfig, CommonModePolicy};
pub use error::{Error, Result};
pub use event::{
    close_six_va_gaps, deinterleave, CorrectedEvent, HardwareVersion, RawEvent, CHIP_CHANNELS,
    SIX_VA_SENSOR_GAPS,
};
