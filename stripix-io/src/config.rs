//! JSON analysis configuration.
//!
//! Every section and field is optional; missing values take the library
//! defaults.
//!
//! ```json
//! {
//!   "clustering": { "high_threshold": 25, "low_threshold": 8, "max_seeds": 10,
//!                   "symmetric": false, "symmetric_width": 1 },
//!   "common_mode": { "enabled": true, "policy": "adaptive", "signal_cut": 50, "band": 10 },
//!   "calibration": { "format": "auto" },
//!   "detector": { "strip_pitch_mm": 0.15 },
//!   "stream": { "bind_address": "127.0.0.1", "port": 8890, "read_timeout_ms": 200 }
//! }
//! ```

use crate::calibration::CalibrationFormat;
use crate::udp::UdpConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use stripix_core::{ClusteringConfig, CommonModeConfig, CommonModePolicy};

/// Default strip pitch in millimetres.
pub const DEFAULT_STRIP_PITCH_MM: f64 = 0.15;

/// Settings for a decoding and clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Clustering and common-mode settings.
    pub clustering: ClusteringConfig,
    /// Calibration file encoding.
    pub calibration_format: CalibrationFormat,
    /// Distance between strip centres, for cluster positions.
    pub strip_pitch_mm: f64,
    /// Live stream receiver settings.
    pub stream: UdpConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            clustering: ClusteringConfig::default(),
            calibration_format: CalibrationFormat::default(),
            strip_pitch_mm: DEFAULT_STRIP_PITCH_MM,
            stream: UdpConfig::default(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonConfig {
    clustering: JsonClustering,
    common_mode: JsonCommonMode,
    calibration: JsonCalibration,
    detector: JsonDetector,
    stream: JsonStream,
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonClustering {
    high_threshold: f64,
    low_threshold: f64,
    max_seeds: usize,
    symmetric: bool,
    symmetric_width: usize,
}

impl Default for JsonClustering {
    fn default() -> Self {
        let defaults = ClusteringConfig::default();
        Self {
            high_threshold: defaults.high_threshold,
            low_threshold: defaults.low_threshold,
            max_seeds: defaults.max_seeds,
            symmetric: defaults.symmetric,
            symmetric_width: defaults.symmetric_width,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonCommonMode {
    enabled: bool,
    policy: CommonModePolicy,
    signal_cut: f64,
    band: f64,
}

impl Default for JsonCommonMode {
    fn default() -> Self {
        let defaults = CommonModeConfig::default();
        Self {
            enabled: true,
            policy: defaults.policy,
            signal_cut: defaults.signal_cut,
            band: defaults.band,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonCalibration {
    format: CalibrationFormat,
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonDetector {
    strip_pitch_mm: f64,
}

impl Default for JsonDetector {
    fn default() -> Self {
        Self {
            strip_pitch_mm: DEFAULT_STRIP_PITCH_MM,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonStream {
    bind_address: String,
    port: u16,
    read_timeout_ms: u64,
    buffer_size: usize,
}

impl Default for JsonStream {
    fn default() -> Self {
        let defaults = UdpConfig::default();
        Self {
            bind_address: defaults.bind_address,
            port: defaults.port,
            read_timeout_ms: u64::try_from(defaults.read_timeout.as_millis()).unwrap_or(u64::MAX),
            buffer_size: defaults.buffer_size,
        }
    }
}

impl AnalysisConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds invalid settings.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let json_config: JsonConfig = serde_json::from_reader(reader)?;
        Self::from_json_config(json_config)
    }

    /// Loads a configuration from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the text is not valid JSON or holds invalid
    /// settings.
    pub fn from_json(json: &str) -> Result<Self> {
        let json_config: JsonConfig = serde_json::from_str(json)?;
        Self::from_json_config(json_config)
    }

    fn from_json_config(config: JsonConfig) -> Result<Self> {
        let common_mode = config.common_mode.enabled.then(|| {
            CommonModeConfig::new(config.common_mode.policy)
                .with_signal_cut(config.common_mode.signal_cut)
                .with_band(config.common_mode.band)
        });

        let clustering = ClusteringConfig {
            high_threshold: config.clustering.high_threshold,
            low_threshold: config.clustering.low_threshold,
            common_mode,
            max_seeds: config.clustering.max_seeds,
            symmetric: config.clustering.symmetric,
            symmetric_width: config.clustering.symmetric_width,
        };

        let stream = UdpConfig::new(config.stream.bind_address, config.stream.port)
            .with_read_timeout(Duration::from_millis(config.stream.read_timeout_ms))
            .with_buffer_size(config.stream.buffer_size);

        let analysis = Self {
            clustering,
            calibration_format: config.calibration.format,
            strip_pitch_mm: config.detector.strip_pitch_mm,
            stream,
        };
        analysis.validate()?;
        Ok(analysis)
    }

    /// Checks every section.
    ///
    /// # Errors
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.clustering.validate()?;
        if self.strip_pitch_mm.is_nan() || self.strip_pitch_mm <= 0.0 {
            return Err(Error::Config(format!(
                "strip pitch must be positive, got {}",
                self.strip_pitch_mm
            )));
        }
        self.stream.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = AnalysisConfig::from_json("{}").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_json_loading() {
        let json = r#"{
            "clustering": { "high_threshold": 30, "low_threshold": 6, "symmetric": true, "symmetric_width": 2 },
            "common_mode": { "policy": "guided", "band": 12.5 },
            "calibration": { "format": "keyed" },
            "stream": { "port": 9000, "read_timeout_ms": 50 }
        }"#;
        let config = AnalysisConfig::from_json(json).unwrap();

        assert!((config.clustering.high_threshold - 30.0).abs() < f64::EPSILON);
        assert!(config.clustering.symmetric);
        assert_eq!(config.clustering.symmetric_width, 2);
        assert_eq!(config.clustering.max_seeds, 10);
        let cm = config.clustering.common_mode.unwrap();
        assert_eq!(cm.policy, CommonModePolicy::Guided);
        assert!((cm.band - 12.5).abs() < f64::EPSILON);
        assert!((cm.signal_cut - 50.0).abs() < f64::EPSILON);
        assert_eq!(config.calibration_format, CalibrationFormat::Keyed);
        assert_eq!(config.stream.port, 9000);
        assert_eq!(config.stream.read_timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_common_mode_disabled() {
        let config = AnalysisConfig::from_json(r#"{"common_mode": {"enabled": false}}"#).unwrap();
        assert!(config.clustering.common_mode.is_none());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let json = r#"{"clustering": {"high_threshold": 5, "low_threshold": 8}}"#;
        assert!(matches!(
            AnalysisConfig::from_json(json),
            Err(Error::CoreError(_))
        ));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let json = r#"{"common_mode": {"policy": "median"}}"#;
        assert!(matches!(AnalysisConfig::from_json(json), Err(Error::Json(_))));
    }
}
