//! File writers for decoded events and cluster tables.

use crate::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use stripix_core::{Cluster, ClusterTable};

/// Header of the cluster CSV export.
pub const CLUSTER_CSV_HEADER: &str = "evt,nclust,seed,signal,width,address,cog";

/// Output encoding, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated text.
    Csv,
    /// A single JSON array.
    Json,
}

impl OutputFormat {
    /// Returns `Json` for a `.json` extension and `Csv` otherwise.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }
}

/// Writer for per-event channel arrays.
///
/// CSV output holds one row per event with three decimals per channel;
/// JSON output is an array of arrays.
pub struct EventArrayWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    rows: usize,
}

impl EventArrayWriter<BufWriter<File>> {
    /// Creates a file writer, picking the format from the extension.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), OutputFormat::from_path(path)))
    }
}

impl<W: Write> EventArrayWriter<W> {
    /// Wraps any writer.
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            rows: 0,
        }
    }

    /// Number of rows written.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    fn open_row(&mut self) -> Result<()> {
        if self.format == OutputFormat::Json {
            let sep = if self.rows == 0 { "[\n" } else { ",\n" };
            self.writer.write_all(sep.as_bytes())?;
        }
        Ok(())
    }

    /// Writes one event of calibrated values.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_values(&mut self, values: &[f64]) -> Result<()> {
        self.open_row()?;
        match self.format {
            OutputFormat::Csv => {
                let row: Vec<String> = values.iter().map(|v| format!("{v:.3}")).collect();
                writeln!(self.writer, "{}", row.join(","))?;
            }
            OutputFormat::Json => serde_json::to_writer(&mut self.writer, values)?,
        }
        self.rows += 1;
        Ok(())
    }

    /// Writes one event of integer samples.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_samples(&mut self, samples: &[u16]) -> Result<()> {
        self.open_row()?;
        match self.format {
            OutputFormat::Csv => {
                let row: Vec<String> = samples.iter().map(u16::to_string).collect();
                writeln!(self.writer, "{}", row.join(","))?;
            }
            OutputFormat::Json => serde_json::to_writer(&mut self.writer, samples)?,
        }
        self.rows += 1;
        Ok(())
    }

    /// Closes the output and returns the number of rows written.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn finish(mut self) -> Result<usize> {
        if self.format == OutputFormat::Json {
            let tail = if self.rows == 0 { "[]\n" } else { "\n]\n" };
            self.writer.write_all(tail.as_bytes())?;
        }
        self.writer.flush()?;
        Ok(self.rows)
    }
}

/// Writes clusters as CSV with a header row.
///
/// # Errors
/// Returns an error if writing fails.
pub fn write_clusters_csv<'a, W, I>(mut writer: W, clusters: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Cluster>,
{
    writeln!(writer, "{CLUSTER_CSV_HEADER}")?;
    for c in clusters {
        writeln!(
            writer,
            "{},{},{},{:.3},{},{},{:.3}",
            c.event, c.nclust, c.seed, c.signal, c.width, c.address, c.cog
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a cluster table to `path`, as JSON for a `.json` extension and
/// CSV otherwise.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_cluster_table<P: AsRef<Path>>(path: P, table: &ClusterTable) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    match OutputFormat::from_path(path) {
        OutputFormat::Csv => write_clusters_csv(&mut writer, table.iter())?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, table)?;
            writer.flush()?;
        }
    }
    log::info!("wrote {} clusters to {}", table.len(), path.display());
    Ok(())
}
