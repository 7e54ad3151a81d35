//! Calibration file loading.
//!
//! Two text encodings are accepted:
//!
//! - **Tabular**: the first 18 lines of the file are descriptive; every
//!   later non-blank line is a comma-separated row of one group. Column 3 is
//!   the pedestal and column 6 the mask flag.
//! - **Keyed**: blocks separated by blank lines open with a `#name=` line.
//!   Rows are accepted once 18 comment lines have been seen in the block and
//!   must have exactly the 8 columns `channel, va_id, va_channel, pedestal,
//!   sigma_raw, sigma, flag, extra`.
//!
//! Rows with the wrong column count are skipped and counted; fields that are
//! not numbers are stored as unknown.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use stripix_core::{CalibrationGroup, CalibrationTable, ChannelCalibration};

/// Descriptive lines preceding the rows of each block.
pub const HEADER_LINES: usize = 18;

const NAME_MARKER: &str = "#name=";
const KEYED_COLUMNS: usize = 8;
const TABULAR_MIN_COLUMNS: usize = 7;

/// Calibration file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationFormat {
    /// Decide from the content.
    #[default]
    Auto,
    /// Fixed 18-line file header, then rows.
    Tabular,
    /// `#name=` blocks with 8 named columns.
    Keyed,
}

impl CalibrationFormat {
    /// Picks the encoding of `text`: keyed if any line opens a named block.
    #[must_use]
    pub fn sniff(text: &str) -> Self {
        if text
            .lines()
            .any(|line| line.trim_start().starts_with(NAME_MARKER))
        {
            Self::Keyed
        } else {
            Self::Tabular
        }
    }

    fn resolve(self, text: &str) -> Self {
        match self {
            Self::Auto => Self::sniff(text),
            explicit => explicit,
        }
    }
}

impl std::str::FromStr for CalibrationFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "tabular" => Ok(Self::Tabular),
            "keyed" => Ok(Self::Keyed),
            other => Err(Error::Config(format!("unknown calibration format {other}"))),
        }
    }
}

fn parse_field(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn channel_from_fields(fields: &[&str]) -> ChannelCalibration {
    let get = |i: usize| fields.get(i).and_then(|f| parse_field(f));
    ChannelCalibration {
        channel: get(0),
        va_id: get(1),
        va_channel: get(2),
        pedestal: get(3),
        sigma_raw: get(4),
        sigma: get(5),
        flag: get(6),
        extra: get(7),
    }
}

#[derive(Default)]
struct TableBuilder {
    groups: Vec<CalibrationGroup>,
    skipped: usize,
}

impl TableBuilder {
    fn skip(&mut self, line_no: usize, line: &str) {
        self.skipped += 1;
        log::debug!("calibration line {line_no}: skipped malformed row {line:?}");
    }

    fn finish(self) -> CalibrationTable {
        log::info!(
            "loaded {} calibration groups ({} rows skipped)",
            self.groups.len(),
            self.skipped
        );
        CalibrationTable::new(self.groups, self.skipped)
    }
}

fn parse_tabular(text: &str) -> CalibrationTable {
    let mut builder = TableBuilder::default();
    let mut channels: Vec<ChannelCalibration> = Vec::new();

    for (line_no, raw) in text.lines().enumerate().skip(HEADER_LINES) {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        let channel = channel_from_fields(&fields);
        if fields.len() < TABULAR_MIN_COLUMNS || channel == ChannelCalibration::default() {
            builder.skip(line_no + 1, line);
            continue;
        }
        channels.push(channel);
    }
    builder.groups.push(CalibrationGroup::new(channels));
    builder.finish()
}

fn parse_keyed(text: &str) -> CalibrationTable {
    let mut builder = TableBuilder::default();
    let mut comment_lines = 0usize;

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if let Some(name) = line.strip_prefix(NAME_MARKER) {
            builder
                .groups
                .push(CalibrationGroup::new(Vec::new()).with_name(name.trim()));
        }
        if line.starts_with('#') {
            comment_lines += 1;
            continue;
        }
        if line.is_empty() {
            comment_lines = 0;
            continue;
        }
        if comment_lines < HEADER_LINES {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != KEYED_COLUMNS {
            builder.skip(line_no + 1, line);
            continue;
        }
        if builder.groups.is_empty() {
            builder.groups.push(CalibrationGroup::new(Vec::new()));
        }
        if let Some(group) = builder.groups.last_mut() {
            group.channels.push(channel_from_fields(&fields));
        }
    }
    builder.finish()
}

/// Parses calibration text.
#[must_use]
pub fn parse_calibration(text: &str, format: CalibrationFormat) -> CalibrationTable {
    match format.resolve(text) {
        CalibrationFormat::Keyed => parse_keyed(text),
        _ => parse_tabular(text),
    }
}

/// Loads a calibration file.
///
/// # Errors
/// Returns an I/O error if the file cannot be read, or
/// [`Error::Calibration`] if it holds no calibration rows at all.
pub fn load_calibration<P: AsRef<Path>>(path: P, format: CalibrationFormat) -> Result<CalibrationTable> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let table = parse_calibration(&text, format);
    if table.groups().iter().all(CalibrationGroup::is_empty) {
        return Err(Error::Calibration {
            path: path.to_path_buf(),
            reason: format!("no calibration rows ({} skipped)", table.skipped_rows()),
        });
    }
    Ok(table)
}
