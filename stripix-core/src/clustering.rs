//! Clustering and common-mode configuration.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Common-mode baseline estimation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CommonModePolicy {
    /// Mean of the values within one standard deviation of the chip mean.
    #[default]
    Adaptive,
    /// Mean of the values below the signal cut.
    FixedThreshold,
    /// Pilot mean from a quiet channel range, then mean of a band around it.
    Guided,
}

impl CommonModePolicy {
    /// Maps the numeric selector used by acquisition scripts (0, 1, 2).
    ///
    /// # Errors
    /// Returns a configuration error for any other selector.
    pub fn from_index(index: u8) -> Result<Self> {
        match index {
            0 => Ok(Self::Adaptive),
            1 => Ok(Self::FixedThreshold),
            2 => Ok(Self::Guided),
            other => Err(Error::ConfigError(format!(
                "unknown common-mode policy {other}"
            ))),
        }
    }
}

/// Configuration for the common-mode estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CommonModeConfig {
    /// Estimation policy.
    pub policy: CommonModePolicy,
    /// Values at or above this are treated as signal, not baseline.
    pub signal_cut: f64,
    /// Half-width of the acceptance band around the pilot mean.
    pub band: f64,
}

impl Default for CommonModeConfig {
    fn default() -> Self {
        Self {
            policy: CommonModePolicy::Adaptive,
            signal_cut: 50.0,
            band: 10.0,
        }
    }
}

impl CommonModeConfig {
    /// Creates a configuration for the given policy with default cuts.
    #[must_use]
    pub fn new(policy: CommonModePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Sets the signal cut.
    #[must_use]
    pub fn with_signal_cut(mut self, cut: f64) -> Self {
        self.signal_cut = cut;
        self
    }

    /// Sets the guided-policy band half-width.
    #[must_use]
    pub fn with_band(mut self, band: f64) -> Self {
        self.band = band;
        self
    }
}

/// Configuration for strip clustering.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusteringConfig {
    /// Seed threshold: strips strictly above it start a cluster.
    pub high_threshold: f64,
    /// Neighbour threshold: strips strictly above it (and below the seed
    /// threshold) extend a cluster.
    pub low_threshold: f64,
    /// Common-mode subtraction applied before seeding, `None` to disable.
    pub common_mode: Option<CommonModeConfig>,
    /// Events with more seed candidates than this are discarded.
    pub max_seeds: usize,
    /// Use a fixed window around each seed instead of threshold growth.
    pub symmetric: bool,
    /// Half-width of the symmetric window.
    pub symmetric_width: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            high_threshold: 25.0,
            low_threshold: 8.0,
            common_mode: Some(CommonModeConfig::default()),
            max_seeds: 10,
            symmetric: false,
            symmetric_width: 1,
        }
    }
}

impl ClusteringConfig {
    /// Creates a new clustering configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets both thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, high: f64, low: f64) -> Self {
        self.high_threshold = high;
        self.low_threshold = low;
        self
    }

    /// Sets or disables common-mode subtraction.
    #[must_use]
    pub fn with_common_mode(mut self, common_mode: Option<CommonModeConfig>) -> Self {
        self.common_mode = common_mode;
        self
    }

    /// Sets the maximum accepted seed count.
    #[must_use]
    pub fn with_max_seeds(mut self, max_seeds: usize) -> Self {
        self.max_seeds = max_seeds;
        self
    }

    /// Switches to symmetric windows of `2 * width + 1` strips.
    #[must_use]
    pub fn with_symmetric_window(mut self, width: usize) -> Self {
        self.symmetric = true;
        self.symmetric_width = width;
        self
    }

    /// Checks the thresholds and window settings.
    ///
    /// # Errors
    /// Returns a configuration error if the seed threshold is not above the
    /// neighbour threshold, or a symmetric window has zero width.
    pub fn validate(&self) -> Result<()> {
        if self.high_threshold.is_nan() || self.low_threshold.is_nan() {
            return Err(Error::ConfigError("thresholds must be numbers".into()));
        }
        if self.high_threshold <= self.low_threshold {
            return Err(Error::ConfigError(format!(
                "high threshold {} must exceed low threshold {}",
                self.high_threshold, self.low_threshold
            )));
        }
        if self.symmetric && self.symmetric_width == 0 {
            return Err(Error::ConfigError(
                "symmetric window width must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
