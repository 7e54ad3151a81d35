//! Data file header discovery.
//!
//! A miniTRB data file carries no fixed-position header. The decoder scans
//! the data two bytes at a time for three markers:
//!
//! 1. An endianness marker, `AA BB` (big) or `BB AA` (little).
//! 2. The event header `90 EB` / `EB 90`.
//! 3. The data-kind byte three bytes after the event header, `A0` for raw.
//!
//! The hardware version word sits two bytes before
//! `header_offset + endianness_offset`.

use crate::word::{Endianness, WordReader};
use crate::{Error, Result};
use stripix_core::HardwareVersion;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Data-kind byte announcing uncompressed raw data.
pub const RAW_KIND: u8 = 0xA0;

/// Fixed size of one on-disk event slot in bytes.
pub const EVENT_STRIDE: usize = 1024;

/// Distance from the event header to the first sample of event 0.
pub const EVENT_PAYLOAD_OFFSET: usize = 4;

const SCAN_STEP: usize = 2;

/// Scans `data` in two-byte steps for the first pair matching a pattern.
///
/// Returns the byte offset of the match and the index of the pattern.
fn scan_pairs(data: &[u8], patterns: &[[u8; 2]]) -> Option<(usize, usize)> {
    data.chunks_exact(SCAN_STEP)
        .enumerate()
        .find_map(|(i, pair)| {
            patterns
                .iter()
                .position(|p| p == pair)
                .map(|which| (i * SCAN_STEP, which))
        })
}

/// Locates the endianness marker.
///
/// # Errors
/// Returns [`Error::SentinelNotFound`] if neither marker occurs.
pub fn seek_endianness(data: &[u8]) -> Result<(Endianness, usize)> {
    match scan_pairs(data, &[[0xAA, 0xBB], [0xBB, 0xAA]]) {
        Some((offset, 0)) => Ok((Endianness::Big, offset)),
        Some((offset, _)) => Ok((Endianness::Little, offset)),
        None => Err(Error::SentinelNotFound {
            sentinel: "endianness",
            scanned_bytes: data.len(),
        }),
    }
}

/// Locates the event header marker.
///
/// # Errors
/// Returns [`Error::SentinelNotFound`] if the marker does not occur.
pub fn seek_header(data: &[u8]) -> Result<usize> {
    scan_pairs(data, &[[0x90, 0xEB], [0xEB, 0x90]])
        .map(|(offset, _)| offset)
        .ok_or(Error::SentinelNotFound {
            sentinel: "event header",
            scanned_bytes: data.len(),
        })
}

/// Checks that the data-kind byte announces raw data.
///
/// # Errors
/// Returns [`Error::UnsupportedFormat`] for compressed or missing kind bytes.
pub fn check_kind(data: &[u8], offset: usize) -> Result<()> {
    match data.get(offset).copied() {
        Some(RAW_KIND) => Ok(()),
        kind => Err(Error::UnsupportedFormat { kind, offset }),
    }
}

/// Framing parameters of a raw data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileLayout {
    /// Byte order of sample words.
    pub endianness: Endianness,
    /// Byte offset of the endianness marker.
    pub endianness_offset: usize,
    /// Byte offset of the event header marker.
    pub header_offset: usize,
    /// Board revision.
    pub version: HardwareVersion,
}

impl FileLayout {
    /// Detects the layout of a raw data file.
    ///
    /// The scans are pure functions of `data`; detecting twice on the same
    /// bytes yields the same layout.
    ///
    /// # Errors
    /// Returns a format error if a marker is missing, the data is not raw,
    /// or the version word is unknown.
    pub fn detect(data: &[u8]) -> Result<Self> {
        let (endianness, endianness_offset) = seek_endianness(data)?;
        let header_offset = seek_header(data)?;
        check_kind(data, header_offset + 3)?;

        let version_offset = (header_offset + endianness_offset).checked_sub(2);
        let marker = version_offset
            .and_then(|offset| WordReader::new(data, endianness).read_word_at(offset))
            .ok_or(Error::HeaderTruncated {
                offset: version_offset,
            })?;
        let version = HardwareVersion::from_marker(marker).map_err(|_| {
            Error::UnknownHardwareVersion {
                marker,
                offset: version_offset.unwrap_or_default(),
            }
        })?;

        log::debug!(
            "detected {version}, {endianness}, header at {header_offset}, marker at {endianness_offset}"
        );

        Ok(Self {
            endianness,
            endianness_offset,
            header_offset,
            version,
        })
    }

    /// Channels per event for this board revision.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.version.channels()
    }

    /// Byte offset of the first sample of event `index`.
    #[must_use]
    pub fn event_offset(&self, index: usize) -> usize {
        index * EVENT_STRIDE + self.header_offset + EVENT_PAYLOAD_OFFSET
    }

    /// Number of complete events that fit in `data_len` bytes.
    #[must_use]
    pub fn complete_events(&self, data_len: usize) -> usize {
        let needed = self.channels() * WordReader::WORD_SIZE;
        let first = self.event_offset(0);
        if data_len < first + needed {
            return 0;
        }
        (data_len - first - needed) / EVENT_STRIDE + 1
    }
}
