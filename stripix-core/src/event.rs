//! Event data types for miniTRB readout.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of consecutive channels read out by one VA chip.
pub const CHIP_CHANNELS: usize = 64;

/// miniTRB hardware revision, identified by a 16-bit version marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HardwareVersion {
    /// 6 VA chips, 384 channels (marker `0x1212`).
    SixVa,
    /// 10 VA chips, 640 channels (marker `0x1313`).
    TenVa,
}

impl HardwareVersion {
    /// Version marker of the 6 VA board.
    pub const SIX_VA_MARKER: u16 = 0x1212;
    /// Version marker of the 10 VA board.
    pub const TEN_VA_MARKER: u16 = 0x1313;

    /// Resolves a version marker word.
    ///
    /// # Errors
    /// Returns [`Error::UnknownHardwareVersion`] for any other marker.
    pub fn from_marker(marker: u16) -> Result<Self> {
        match marker {
            Self::SIX_VA_MARKER => Ok(Self::SixVa),
            Self::TEN_VA_MARKER => Ok(Self::TenVa),
            other => Err(Error::UnknownHardwareVersion(other)),
        }
    }

    /// Returns the on-disk marker for this version.
    #[must_use]
    pub fn marker(self) -> u16 {
        match self {
            Self::SixVa => Self::SIX_VA_MARKER,
            Self::TenVa => Self::TEN_VA_MARKER,
        }
    }

    /// Number of detector channels read out per event.
    #[must_use]
    pub fn channels(self) -> usize {
        match self {
            Self::SixVa => 384,
            Self::TenVa => 640,
        }
    }

    /// Number of VA chips on the board.
    #[must_use]
    pub fn chips(self) -> usize {
        self.channels() / CHIP_CHANNELS
    }
}

impl std::fmt::Display for HardwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SixVa => write!(f, "miniTRB 6VA ({:#06x})", self.marker()),
            Self::TenVa => write!(f, "miniTRB 10VA ({:#06x})", self.marker()),
        }
    }
}

/// One event as read from the wire, in readout order.
///
/// Samples are ADC counts with the two status bits already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawEvent {
    /// Zero-based position of the event in its source.
    pub index: usize,
    /// ADC samples, one per channel.
    pub samples: Vec<u16>,
}

impl RawEvent {
    /// Creates a raw event.
    #[must_use]
    pub fn new(index: usize, samples: Vec<u16>) -> Self {
        Self { index, samples }
    }

    /// Returns the number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the event has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the samples in detector order.
    ///
    /// The board interleaves two halves of the detector: even readout slots
    /// carry the first half, odd slots the second.
    #[must_use]
    pub fn deinterleaved(&self) -> Vec<u16> {
        deinterleave(&self.samples)
    }
}

/// Un-shuffles an even/odd interleaved sequence.
///
/// The output holds every even-indexed input first, followed by every
/// odd-indexed input, each in their original relative order.
#[must_use]
pub fn deinterleave<T: Copy>(values: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(values.len());
    out.extend(values.iter().step_by(2).copied());
    out.extend(values.iter().skip(1).step_by(2).copied());
    out
}

/// Detector-order channel ranges of a 10VA board with no strips behind them
/// when the board reads out a 6VA sensor.
pub const SIX_VA_SENSOR_GAPS: [std::ops::Range<usize>; 2] = [192..320, 512..640];

/// Drops the unconnected channels of a 10VA board reading a 6VA sensor.
///
/// `values` must be a full 10VA event in detector order; the result holds
/// the 384 connected channels. Returns `None` for any other length.
#[must_use]
pub fn close_six_va_gaps<T: Copy>(values: &[T]) -> Option<Vec<T>> {
    if values.len() != HardwareVersion::TenVa.channels() {
        return None;
    }
    Some(
        values
            .iter()
            .enumerate()
            .filter(|(i, _)| !SIX_VA_SENSOR_GAPS.iter().any(|gap| gap.contains(i)))
            .map(|(_, &v)| v)
            .collect(),
    )
}

/// An event in detector channel order after calibration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CorrectedEvent {
    /// Zero-based position of the event in its source.
    pub index: usize,
    /// Corrected signal per channel.
    pub values: Vec<f64>,
}

impl CorrectedEvent {
    /// Creates a corrected event.
    #[must_use]
    pub fn new(index: usize, values: Vec<f64>) -> Self {
        Self { index, values }
    }

    /// Returns the number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the event has no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
