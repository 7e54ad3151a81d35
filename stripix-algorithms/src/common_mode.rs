//! Common-mode baseline estimation.
//!
//! All channels of one chip share a correlated baseline shift. The estimator
//! computes one scalar per 64-channel chip group and subtracts it from every
//! channel of that group.

use stripix_core::{CommonModeConfig, CommonModePolicy, CHIP_CHANNELS};

/// Pilot channel range of the guided policy.
const PILOT_RANGE: std::ops::Range<usize> = 8..23;

/// Channel range averaged by the guided policy.
const GUIDED_RANGE: std::ops::Range<usize> = 24..55;

fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    #[allow(clippy::cast_precision_loss)]
    (count > 0).then(|| sum / count as f64)
}

/// Mean of the values inside `(m - s, m + s)`, with `s` the population
/// standard deviation.
fn adaptive(values: &[f64]) -> Option<f64> {
    let m = mean(values.iter().copied())?;
    #[allow(clippy::cast_precision_loss)]
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    let s = variance.sqrt();
    mean(values.iter().copied().filter(|&v| v > m - s && v < m + s))
}

fn fixed_threshold(values: &[f64], cut: f64) -> Option<f64> {
    mean(values.iter().copied().filter(|&v| v < cut))
}

fn guided(values: &[f64], cut: f64, band: f64) -> Option<f64> {
    let pilot = mean(
        values
            .get(PILOT_RANGE)?
            .iter()
            .copied()
            .filter(|&v| v < cut),
    )?;
    mean(
        values
            .get(GUIDED_RANGE)?
            .iter()
            .copied()
            .filter(|&v| (v - pilot).abs() < band),
    )
}

/// Estimates the baseline of one chip group.
///
/// Returns `None` when no value qualifies under the configured policy.
#[must_use]
pub fn estimate(values: &[f64], config: &CommonModeConfig) -> Option<f64> {
    match config.policy {
        CommonModePolicy::Adaptive => adaptive(values),
        CommonModePolicy::FixedThreshold => fixed_threshold(values, config.signal_cut),
        CommonModePolicy::Guided => guided(values, config.signal_cut, config.band),
    }
}

/// Estimates the baseline of every full chip group in an event.
///
/// A trailing partial group is not estimated.
#[must_use]
pub fn estimate_chips(values: &[f64], config: &CommonModeConfig) -> Vec<Option<f64>> {
    values
        .chunks_exact(CHIP_CHANNELS)
        .map(|chip| estimate(chip, config))
        .collect()
}

/// Subtracts the per-chip baseline in place and returns the estimates.
///
/// Chips without an estimate are left unchanged.
pub fn subtract_common_mode(values: &mut [f64], config: &CommonModeConfig) -> Vec<Option<f64>> {
    let baselines = estimate_chips(values, config);
    for (chip, baseline) in values.chunks_exact_mut(CHIP_CHANNELS).zip(&baselines) {
        match baseline {
            Some(cm) => chip.iter_mut().for_each(|v| *v -= cm),
            None => log::trace!("no common-mode estimate, chip left unsubtracted"),
        }
    }
    baselines
}
