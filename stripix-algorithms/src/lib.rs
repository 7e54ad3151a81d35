//! stripix-algorithms: Signal processing for microstrip events.
//!
//! This crate provides the per-event algorithms:
//! - **Common mode** - per-chip baseline estimation (adaptive, fixed
//!   threshold, guided)
//! - **Clustering** - seed finding, adjacency pruning, threshold growth or
//!   symmetric windows
//! - **Quality** - eta, signal to noise and position of a cluster
//!
#![warn(missing_docs)]

pub mod common_mode;
mod clustering;
mod processing;
mod quality;

pub use clustering::{find_seeds, prune_adjacent, ClusteringState, StripClustering};
pub use common_mode::{estimate, estimate_chips, subtract_common_mode};
pub use processing::{cluster_events, correct_events, process_events};
pub use quality::{eta, ClusterQuality};

// Re-export core configuration types
pub use stripix_core::{ClusteringConfig, CommonModeConfig, CommonModePolicy};
