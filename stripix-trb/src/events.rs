//! Fixed-stride event extraction from raw data files.

use crate::layout::FileLayout;
use crate::word::WordReader;
use stripix_core::RawEvent;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How on-wire sample words become ADC counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SampleMode {
    /// Drop the two low ADC status bits (integer division by 4).
    #[default]
    StripStatusBits,
    /// Keep the 16-bit word as written, status bits included.
    Verbatim,
}

impl SampleMode {
    /// Converts one on-wire word to a sample.
    #[inline]
    #[must_use]
    pub fn decode(self, word: u16) -> u16 {
        match self {
            SampleMode::StripStatusBits => word >> 2,
            SampleMode::Verbatim => word,
        }
    }
}

/// Why event iteration stopped.
///
/// A short read at an event slot means there are no more complete events,
/// for example trailing padding or a file cut during acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Truncation {
    /// Index of the event that could not be read.
    pub event_index: usize,
    /// Byte offset of that event's first sample.
    pub offset: usize,
    /// Words actually available at that offset.
    pub words_read: usize,
    /// Words a complete event needs.
    pub words_expected: usize,
}

impl Truncation {
    /// Returns true if the last slot held some but not all samples.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.words_read > 0
    }
}

/// Reads event `index` from `data`.
///
/// # Errors
/// Returns the [`Truncation`] record if fewer than the hardware channel
/// count of words are available at the event offset.
pub fn read_event(
    data: &[u8],
    layout: &FileLayout,
    index: usize,
    mode: SampleMode,
) -> Result<RawEvent, Truncation> {
    let offset = layout.event_offset(index);
    let channels = layout.channels();
    let mut reader = WordReader::new(data, layout.endianness);
    let words = reader.read_words_at(offset, channels);
    if words.len() < channels {
        return Err(Truncation {
            event_index: index,
            offset,
            words_read: words.len(),
            words_expected: channels,
        });
    }
    let samples = words.into_iter().map(|w| mode.decode(w)).collect();
    Ok(RawEvent::new(index, samples))
}

/// Lazy, finite iterator over the complete events of a data file.
///
/// Iteration ends at the first incomplete event slot; the reason is
/// available from [`RawEvents::truncation`] afterwards. Creating a new
/// iterator over the same data restarts from event 0.
#[derive(Debug, Clone)]
pub struct RawEvents<'a> {
    data: &'a [u8],
    layout: FileLayout,
    mode: SampleMode,
    next_index: usize,
    truncation: Option<Truncation>,
}

impl<'a> RawEvents<'a> {
    /// Creates an iterator starting at event 0.
    #[must_use]
    pub fn new(data: &'a [u8], layout: FileLayout) -> Self {
        Self {
            data,
            layout,
            mode: SampleMode::default(),
            next_index: 0,
            truncation: None,
        }
    }

    /// Sets the sample decoding mode.
    #[must_use]
    pub fn with_mode(mut self, mode: SampleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the layout driving this iterator.
    #[must_use]
    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }

    /// Number of events yielded so far.
    #[must_use]
    pub fn events_read(&self) -> usize {
        self.next_index
    }

    /// The stop record, once iteration has ended.
    #[must_use]
    pub fn truncation(&self) -> Option<&Truncation> {
        self.truncation.as_ref()
    }
}

impl Iterator for RawEvents<'_> {
    type Item = RawEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.truncation.is_some() {
            return None;
        }
        match read_event(self.data, &self.layout, self.next_index, self.mode) {
            Ok(event) => {
                self.next_index += 1;
                Some(event)
            }
            Err(truncation) => {
                if truncation.is_partial() {
                    log::info!(
                        "event {} truncated at offset {}: {} of {} words",
                        truncation.event_index,
                        truncation.offset,
                        truncation.words_read,
                        truncation.words_expected
                    );
                } else {
                    log::debug!("end of data after {} events", truncation.event_index);
                }
                self.truncation = Some(truncation);
                None
            }
        }
    }
}

impl std::iter::FusedIterator for RawEvents<'_> {}
