//! Calibration table types and pedestal correction.
//!
//! A calibration table holds one [`CalibrationGroup`] per detector (or
//! connector) found in the calibration file. Entries keep every parsed
//! column; values that failed to parse are `None` and are never treated as
//! zero.

use crate::event::{CorrectedEvent, RawEvent};
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Calibration constants for a single channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelCalibration {
    /// Channel number as written in the file.
    pub channel: Option<f64>,
    /// VA chip the channel belongs to.
    pub va_id: Option<f64>,
    /// Channel index inside its VA chip.
    pub va_channel: Option<f64>,
    /// Pedestal (baseline offset) in ADC counts.
    pub pedestal: Option<f64>,
    /// Noise before common-mode subtraction.
    pub sigma_raw: Option<f64>,
    /// Noise after common-mode subtraction.
    pub sigma: Option<f64>,
    /// Channel status flag, nonzero means masked.
    pub flag: Option<f64>,
    /// Unused trailing column.
    pub extra: Option<f64>,
}

impl ChannelCalibration {
    /// Returns true if the channel is flagged as dead or noisy.
    #[inline]
    #[must_use]
    pub fn is_masked(&self) -> bool {
        self.flag.is_some_and(|flag| flag > 0.0)
    }
}

/// What to do with raw samples when producing a corrected event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Correction {
    /// Subtract pedestals and zero masked channels.
    #[default]
    Signal,
    /// Keep raw ADC counts, only zero masked channels.
    Raw,
}

/// Calibration constants for one detector block.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationGroup {
    /// Block name (from a `#name=` marker), if any.
    pub name: Option<String>,
    /// Per-channel constants in channel order.
    pub channels: Vec<ChannelCalibration>,
}

impl CalibrationGroup {
    /// Creates an unnamed group.
    #[must_use]
    pub fn new(channels: Vec<ChannelCalibration>) -> Self {
        Self {
            name: None,
            channels,
        }
    }

    /// Sets the group name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Number of calibrated channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if the group has no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Returns the constants of one channel, `None` if unmapped.
    #[inline]
    #[must_use]
    pub fn get(&self, channel: usize) -> Option<&ChannelCalibration> {
        self.channels.get(channel)
    }

    /// Returns true if the channel is present and masked.
    #[inline]
    #[must_use]
    pub fn is_masked(&self, channel: usize) -> bool {
        self.get(channel).is_some_and(ChannelCalibration::is_masked)
    }

    /// Fails unless the group covers exactly `channels` channels.
    ///
    /// # Errors
    /// Returns [`Error::ChannelCountMismatch`] on a size mismatch.
    pub fn check_channel_count(&self, channels: usize) -> Result<()> {
        if self.len() == channels {
            Ok(())
        } else {
            Err(Error::ChannelCountMismatch {
                expected: channels,
                actual: self.len(),
            })
        }
    }

    /// Applies the calibration to samples already in detector order.
    ///
    /// Channels without an entry are passed through untouched. A pedestal
    /// that failed to parse is not subtracted.
    #[must_use]
    pub fn apply(&self, samples: &[u16], correction: Correction) -> Vec<f64> {
        samples
            .iter()
            .enumerate()
            .map(|(channel, &sample)| {
                let value = f64::from(sample);
                match self.get(channel) {
                    Some(cal) if cal.is_masked() => 0.0,
                    Some(cal) => match (correction, cal.pedestal) {
                        (Correction::Signal, Some(pedestal)) => value - pedestal,
                        _ => value,
                    },
                    None => value,
                }
            })
            .collect()
    }

    /// Un-shuffles a raw event and applies the calibration to it.
    #[must_use]
    pub fn correct(&self, raw: &RawEvent, correction: Correction) -> CorrectedEvent {
        CorrectedEvent::new(raw.index, self.apply(&raw.deinterleaved(), correction))
    }
}

/// Calibration constants for every block of a calibration file.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationTable {
    groups: Vec<CalibrationGroup>,
    skipped_rows: usize,
}

impl CalibrationTable {
    /// Creates a table from parsed groups.
    #[must_use]
    pub fn new(groups: Vec<CalibrationGroup>, skipped_rows: usize) -> Self {
        Self {
            groups,
            skipped_rows,
        }
    }

    /// Returns a group by index.
    ///
    /// # Errors
    /// Returns [`Error::MissingCalibrationGroup`] if the index is out of range.
    pub fn group(&self, index: usize) -> Result<&CalibrationGroup> {
        self.groups
            .get(index)
            .ok_or(Error::MissingCalibrationGroup(index))
    }

    /// Returns a group by its `#name=` value.
    #[must_use]
    pub fn group_by_name(&self, name: &str) -> Option<&CalibrationGroup> {
        self.groups.iter().find(|g| g.name.as_deref() == Some(name))
    }

    /// All groups in file order.
    #[must_use]
    pub fn groups(&self) -> &[CalibrationGroup] {
        &self.groups
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no group was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of data rows skipped for having the wrong shape.
    #[must_use]
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn channel(pedestal: f64, flag: f64) -> ChannelCalibration {
        ChannelCalibration {
            pedestal: Some(pedestal),
            flag: Some(flag),
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_signal_subtracts_and_masks() {
        let group = CalibrationGroup::new(vec![
            channel(100.0, 0.0),
            channel(200.0, 1.0),
            channel(50.5, 0.0),
        ]);
        let values = group.apply(&[110, 250, 60], Correction::Signal);
        assert_abs_diff_eq!(values[0], 10.0);
        assert_abs_diff_eq!(values[1], 0.0);
        assert_abs_diff_eq!(values[2], 9.5);
    }

    #[test]
    fn test_apply_raw_only_masks() {
        let group = CalibrationGroup::new(vec![channel(100.0, 0.0), channel(200.0, 2.0)]);
        let values = group.apply(&[110, 250], Correction::Raw);
        assert_abs_diff_eq!(values[0], 110.0);
        assert_abs_diff_eq!(values[1], 0.0);
    }

    #[test]
    fn test_unmapped_and_unknown_channels_pass_through() {
        let unknown = ChannelCalibration {
            pedestal: None,
            ..Default::default()
        };
        let group = CalibrationGroup::new(vec![unknown]);
        let values = group.apply(&[42, 43], Correction::Signal);
        assert_abs_diff_eq!(values[0], 42.0);
        assert_abs_diff_eq!(values[1], 43.0);
        assert!(!group.is_masked(0));
        assert!(!group.is_masked(1));
    }

    #[test]
    fn test_correct_deinterleaves_first() {
        let group = CalibrationGroup::new(vec![
            channel(1.0, 0.0),
            channel(2.0, 0.0),
            channel(3.0, 0.0),
            channel(4.0, 0.0),
        ]);
        let raw = RawEvent::new(7, vec![11, 13, 12, 14]);
        let event = group.correct(&raw, Correction::Signal);
        assert_eq!(event.index, 7);
        assert_eq!(event.values, vec![10.0, 10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_table_lookup() {
        let table = CalibrationTable::new(
            vec![
                CalibrationGroup::new(vec![channel(1.0, 0.0)]).with_name("J7"),
                CalibrationGroup::new(vec![channel(2.0, 0.0)]).with_name("J5"),
            ],
            3,
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.skipped_rows(), 3);
        assert_eq!(table.group(1).unwrap().name.as_deref(), Some("J5"));
        assert!(table.group_by_name("J7").is_some());
        assert_eq!(table.group(2), Err(Error::MissingCalibrationGroup(2)));
    }

    #[test]
    fn test_check_channel_count() {
        let group = CalibrationGroup::new(vec![channel(1.0, 0.0); 384]);
        assert!(group.check_channel_count(384).is_ok());
        assert_eq!(
            group.check_channel_count(640),
            Err(Error::ChannelCountMismatch {
                expected: 640,
                actual: 384
            })
        );
    }
}
