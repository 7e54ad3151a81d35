//! Per-cluster quality metrics against a calibration group.

use stripix_core::{CalibrationGroup, Cluster};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Derived quantities describing one cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterQuality {
    /// Charge sharing between the highest strip and its larger neighbour,
    /// as `left / (left + right)`. `1.0` for single-strip clusters.
    pub eta: Option<f64>,
    /// Seed strip signal over its noise.
    pub seed_snr: Option<f64>,
    /// Quadrature sum of the per-strip signal to noise ratios.
    pub cluster_snr: Option<f64>,
    /// True if every strip is calibrated and unmasked.
    pub good: bool,
    /// Centre of gravity in millimetres.
    pub position_mm: f64,
}

impl ClusterQuality {
    /// Evaluates a cluster.
    ///
    /// Strips without a positive sigma in `calibration` do not contribute
    /// to the signal to noise ratios.
    #[must_use]
    pub fn evaluate(cluster: &Cluster, calibration: &CalibrationGroup, pitch_mm: f64) -> Self {
        let sigma = |strip: usize| {
            calibration
                .get(strip)
                .and_then(|c| c.sigma)
                .filter(|&s| s > 0.0)
        };

        let seed_snr = cluster
            .iter_strips()
            .find(|&(strip, _)| strip == cluster.seed)
            .and_then(|(strip, signal)| sigma(strip).map(|s| signal / s));

        let sum_sq: Option<f64> = cluster
            .iter_strips()
            .filter_map(|(strip, signal)| sigma(strip).map(|s| (signal / s).powi(2)))
            .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v));

        let good = cluster.iter_strips().all(|(strip, _)| {
            calibration
                .get(strip)
                .is_some_and(|c| c.flag.is_some() && !c.is_masked())
        });

        Self {
            eta: eta(&cluster.strips),
            seed_snr,
            cluster_snr: sum_sq.filter(|&s| s > 0.0).map(f64::sqrt),
            good,
            position_mm: cluster.cog * pitch_mm,
        }
    }
}

/// Charge sharing ratio of a strip sequence.
///
/// Returns `None` for an empty cluster or a zero-sum pair.
#[must_use]
pub fn eta(strips: &[f64]) -> Option<f64> {
    let (max_pos, _) = strips
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    if strips.len() == 1 {
        return Some(1.0);
    }
    let left = if max_pos == 0 {
        0
    } else if max_pos == strips.len() - 1 || strips[max_pos - 1] > strips[max_pos + 1] {
        max_pos - 1
    } else {
        max_pos
    };
    let (a, b) = (strips[left], strips[left + 1]);
    let sum = a + b;
    (sum != 0.0).then(|| a / sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use stripix_core::ChannelCalibration;

    fn calibration(sigma: f64, masked: &[usize]) -> CalibrationGroup {
        let channels = (0..64)
            .map(|i| ChannelCalibration {
                sigma: Some(sigma),
                flag: Some(if masked.contains(&i) { 1.0 } else { 0.0 }),
                ..ChannelCalibration::default()
            })
            .collect();
        CalibrationGroup::new(channels)
    }

    fn cluster(first: usize, strips: Vec<f64>, seed: usize) -> Cluster {
        Cluster {
            event: 1,
            nclust: 1,
            seed,
            signal: strips.iter().sum(),
            width: strips.len(),
            address: first,
            cog: 10.0,
            first_strip: first,
            strips,
        }
    }

    #[test]
    fn test_eta() {
        assert_eq!(eta(&[]), None);
        assert_eq!(eta(&[40.0]), Some(1.0));
        assert_relative_eq!(eta(&[30.0, 10.0]).unwrap(), 0.75);
        assert_relative_eq!(eta(&[10.0, 30.0]).unwrap(), 0.25);
        // Larger neighbour on the left
        assert_relative_eq!(eta(&[20.0, 60.0, 5.0]).unwrap(), 0.25);
        // Larger neighbour on the right
        assert_relative_eq!(eta(&[5.0, 60.0, 20.0]).unwrap(), 0.75);
    }

    #[test]
    fn test_signal_to_noise() {
        let c = cluster(9, vec![6.0, 40.0, 8.0], 10);
        let q = ClusterQuality::evaluate(&c, &calibration(2.0, &[]), 0.15);

        assert_relative_eq!(q.seed_snr.unwrap(), 20.0);
        assert_relative_eq!(q.cluster_snr.unwrap(), (9.0f64 + 400.0 + 16.0).sqrt());
        assert_relative_eq!(q.position_mm, 1.5);
        assert!(q.good);
    }

    #[test]
    fn test_masked_strip_makes_cluster_bad() {
        let c = cluster(9, vec![6.0, 40.0, 8.0], 10);
        let q = ClusterQuality::evaluate(&c, &calibration(2.0, &[11]), 0.15);
        assert!(!q.good);
    }

    #[test]
    fn test_missing_noise() {
        let c = cluster(9, vec![6.0, 40.0, 8.0], 10);
        let q = ClusterQuality::evaluate(&c, &calibration(0.0, &[]), 0.15);
        assert_eq!(q.seed_snr, None);
        assert_eq!(q.cluster_snr, None);
    }
}
