//! stripix-io: File and network I/O for stripix.
//!
//! This crate provides memory-mapped data file reading via memmap2,
//! calibration file loading, CSV/JSON exports, the JSON analysis
//! configuration and the live UDP receiver.
//!

pub mod calibration;
pub mod config;
mod error;
mod reader;
pub mod udp;
mod writer;

pub use calibration::{load_calibration, parse_calibration, CalibrationFormat};
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use reader::{FileInfo, MappedFileReader, TrbFileReader};
pub use udp::{LatestFrame, UdpConfig, UdpReceiver};
pub use writer::{
    write_cluster_table, write_clusters_csv, EventArrayWriter, OutputFormat, CLUSTER_CSV_HEADER,
};
