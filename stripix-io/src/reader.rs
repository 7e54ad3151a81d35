//! Memory-mapped file readers.
//!

use crate::{Error, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stripix_core::{
    close_six_va_gaps, CalibrationGroup, CorrectedEvent, Correction, HardwareVersion, RawEvent,
};
use stripix_trb::{Endianness, FileLayout, RawEvents, SampleMode, Truncation};

/// A memory-mapped file reader.
///
/// Uses memmap2 to efficiently access file contents without
/// loading the entire file into memory.
pub struct MappedFileReader {
    mmap: Arc<Mmap>,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap: Arc::new(mmap),
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns the path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Header summary of a data file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FileInfo {
    /// Path of the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub file_size: usize,
    /// Byte order of sample words.
    pub endianness: Endianness,
    /// Offset of the endianness marker.
    pub endianness_offset: usize,
    /// Offset of the event header.
    pub header_offset: usize,
    /// Board revision.
    pub version: HardwareVersion,
    /// Channels per event.
    pub channels: usize,
    /// Complete events in the file.
    pub events: usize,
}

impl std::fmt::Display for FileInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "file:        {}", self.path.display())?;
        writeln!(f, "size:        {} bytes", self.file_size)?;
        writeln!(
            f,
            "byte order:  {} (marker at {})",
            self.endianness, self.endianness_offset
        )?;
        writeln!(f, "header:      offset {}", self.header_offset)?;
        writeln!(f, "hardware:    {} ({} channels)", self.version, self.channels)?;
        write!(f, "events:      {}", self.events)
    }
}

/// A miniTRB data file reader with memory-mapped I/O.
pub struct TrbFileReader {
    reader: MappedFileReader,
    layout: FileLayout,
    mode: SampleMode,
    six_va_sensor: bool,
}

impl TrbFileReader {
    /// Opens a data file and detects its layout.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped, or a
    /// [`Error::Format`] naming the file if its header is not valid.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = MappedFileReader::open(path)?;
        let layout = FileLayout::detect(reader.as_bytes()).map_err(|source| Error::Format {
            path: reader.path().to_path_buf(),
            source,
        })?;
        log::info!(
            "{}: {}, {}, {} complete events",
            reader.path().display(),
            layout.version,
            layout.endianness,
            layout.complete_events(reader.len())
        );
        Ok(Self {
            reader,
            layout,
            mode: SampleMode::default(),
            six_va_sensor: false,
        })
    }

    /// Sets how sample words are turned into ADC counts.
    #[must_use]
    pub fn with_sample_mode(mut self, mode: SampleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Marks a 10VA file as read from a 6VA sensor, so the unconnected
    /// channels are dropped from every event in detector order.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the file was not written by a 10VA board.
    pub fn with_six_va_sensor(mut self, enabled: bool) -> Result<Self> {
        if enabled && self.layout.version != HardwareVersion::TenVa {
            return Err(Error::Config(format!(
                "{}: 6VA sensor mode needs a 10VA file, found {}",
                self.path().display(),
                self.layout.version
            )));
        }
        self.six_va_sensor = enabled;
        Ok(self)
    }

    /// Returns the detected layout.
    #[must_use]
    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.len()
    }

    /// Detector channels per event, after any 6VA sensor gaps are closed.
    #[must_use]
    pub fn channels(&self) -> usize {
        if self.six_va_sensor {
            HardwareVersion::SixVa.channels()
        } else {
            self.layout.channels()
        }
    }

    /// Returns the samples of `event` in detector order.
    #[must_use]
    pub fn detector_samples(&self, event: &RawEvent) -> Vec<u16> {
        let samples = event.deinterleaved();
        if self.six_va_sensor {
            close_six_va_gaps(&samples).unwrap_or(samples)
        } else {
            samples
        }
    }

    /// Summarizes the file header without decoding events.
    #[must_use]
    pub fn info(&self) -> FileInfo {
        FileInfo {
            path: self.path().to_path_buf(),
            file_size: self.file_size(),
            endianness: self.layout.endianness,
            endianness_offset: self.layout.endianness_offset,
            header_offset: self.layout.header_offset,
            version: self.layout.version,
            channels: self.layout.channels(),
            events: self.layout.complete_events(self.file_size()),
        }
    }

    /// Iterates over the events of the file from the start.
    pub fn events(&self) -> RawEvents<'_> {
        RawEvents::new(self.reader.as_bytes(), self.layout).with_mode(self.mode)
    }

    /// Reads every complete event.
    ///
    /// Returns the events and the record of where reading stopped.
    #[must_use]
    pub fn read_events(&self) -> (Vec<RawEvent>, Option<Truncation>) {
        let mut iter = self.events();
        let events: Vec<RawEvent> = iter.by_ref().collect();
        (events, iter.truncation().copied())
    }

    /// Reads every complete event and applies a calibration group.
    ///
    /// # Errors
    /// Returns [`Error::CoreError`] if the group does not cover the
    /// hardware channel count.
    pub fn read_corrected(
        &self,
        calibration: &CalibrationGroup,
        correction: Correction,
    ) -> Result<Vec<CorrectedEvent>> {
        calibration.check_channel_count(self.channels())?;
        let (events, _) = self.read_events();
        if !self.six_va_sensor {
            return Ok(stripix_algorithms::correct_events(
                &events,
                calibration,
                correction,
            ));
        }
        Ok(events
            .iter()
            .map(|event| {
                let samples = self.detector_samples(event);
                CorrectedEvent::new(event.index, calibration.apply(&samples, correction))
            })
            .collect())
    }
}
