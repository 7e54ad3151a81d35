//! stripix command-line interface.
//!
//! Decodes miniTRB data files, exports calibrated channel arrays, builds
//! cluster tables and captures the live UDP stream.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use stripix_algorithms::{cluster_events, ClusterQuality, StripClustering};
use stripix_core::{
    CalibrationGroup, CalibrationTable, ClusterTable, CommonModeConfig, CommonModePolicy,
    Correction,
};
use stripix_io::{
    load_calibration, write_cluster_table, AnalysisConfig, CalibrationFormat, EventArrayWriter,
    TrbFileReader, UdpReceiver,
};
use stripix_trb::{BoardFrame, SampleMode};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    StripixIo(#[from] stripix_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] stripix_core::Error),

    #[error("{0}")]
    Usage(String),
}

/// Common-mode policy selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CommonModeArg {
    /// Mean within one standard deviation of the chip mean
    Adaptive,
    /// Mean of the values below the signal cut
    FixedThreshold,
    /// Pilot mean on quiet channels, then a band around it
    Guided,
    /// No common-mode subtraction
    None,
}

/// Calibration file encoding.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Auto,
    Tabular,
    Keyed,
}

impl From<FormatArg> for CalibrationFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => Self::Auto,
            FormatArg::Tabular => Self::Tabular,
            FormatArg::Keyed => Self::Keyed,
        }
    }
}

/// miniTRB silicon microstrip data decoder.
#[derive(Parser)]
#[command(name = "stripix")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Analysis configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the header layout and event count of data files
    Info {
        /// Input data file(s)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Decode events into per-event channel arrays (CSV or JSON)
    Convert {
        /// Input data file
        input: PathBuf,

        /// Output file path (.csv or .json)
        #[arg(short, long)]
        output: PathBuf,

        /// Calibration file; without it the raw samples are written
        #[arg(long)]
        calibration: Option<PathBuf>,

        /// Calibration file encoding
        #[arg(long, value_enum)]
        calibration_format: Option<FormatArg>,

        /// Calibration group to apply
        #[arg(long, default_value = "0")]
        group: usize,

        /// Keep ADC counts instead of subtracting pedestals
        #[arg(long)]
        raw: bool,

        /// Keep the ADC status bits in each sample
        #[arg(long)]
        keep_status_bits: bool,

        /// Drop the unconnected channels of a 10VA board reading a 6VA sensor
        #[arg(long = "ten-to-six")]
        ten_to_six: bool,
    },

    /// Cluster calibrated events and write the cluster table
    Clusterize {
        /// Input data file(s)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output file path (.csv or .json)
        #[arg(short, long)]
        output: PathBuf,

        /// Calibration file
        #[arg(long)]
        calibration: PathBuf,

        /// Calibration file encoding
        #[arg(long, value_enum)]
        calibration_format: Option<FormatArg>,

        /// Calibration group to apply
        #[arg(long, default_value = "0")]
        group: usize,

        /// Seed threshold
        #[arg(long)]
        high: Option<f64>,

        /// Neighbour threshold
        #[arg(long)]
        low: Option<f64>,

        /// Maximum seed candidates per event
        #[arg(long)]
        max_seeds: Option<usize>,

        /// Common-mode policy
        #[arg(long, value_enum)]
        common_mode: Option<CommonModeArg>,

        /// Use symmetric windows of 2 * WIDTH + 1 strips
        #[arg(long, value_name = "WIDTH")]
        symmetric: Option<usize>,

        /// Strip pitch in millimetres
        #[arg(long)]
        pitch: Option<f64>,
    },

    /// Capture board frames from the live UDP stream
    Listen {
        /// Local port
        #[arg(short, long)]
        port: Option<u16>,

        /// Local address
        #[arg(long)]
        bind: Option<String>,

        /// Stop after this many seconds
        #[arg(long, default_value = "10")]
        duration: u64,

        /// Stop after this many frames
        #[arg(long)]
        max_frames: Option<usize>,

        /// Write each captured frame as a row (.csv or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Calibration file; group 0 applies to J7 and group 1 to J5
        #[arg(long)]
        calibration: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => Ok(AnalysisConfig::from_file(path)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn select_group(table: &CalibrationTable, index: usize) -> Result<&CalibrationGroup> {
    let group = table.group(index)?;
    if let Some(name) = &group.name {
        log::info!("using calibration group {index} ({name})");
    }
    Ok(group)
}

fn run_info(input: &[PathBuf], json: bool) -> Result<()> {
    for path in input {
        let info = TrbFileReader::open(path)?.info();
        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).map_err(stripix_io::Error::from)?
            );
        } else {
            println!("{info}");
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_convert(
    input: &Path,
    output: &Path,
    calibration: Option<&Path>,
    format: CalibrationFormat,
    group: usize,
    correction: Correction,
    mode: SampleMode,
    ten_to_six: bool,
) -> Result<()> {
    let start = Instant::now();
    let reader = TrbFileReader::open(input)?
        .with_sample_mode(mode)
        .with_six_va_sensor(ten_to_six)?;
    if ten_to_six {
        log::info!("dropping the channels a 6VA sensor leaves unconnected");
    }
    let mut writer = EventArrayWriter::create(output)?;

    match calibration {
        Some(path) => {
            let table = load_calibration(path, format)?;
            let group = select_group(&table, group)?;
            for event in reader.read_corrected(group, correction)? {
                writer.write_values(&event.values)?;
            }
        }
        None => {
            if correction == Correction::Signal {
                log::warn!("no calibration given, writing un-shuffled raw samples");
            }
            for event in reader.events() {
                writer.write_samples(&reader.detector_samples(&event))?;
            }
        }
    }

    let rows = writer.finish()?;
    println!(
        "Converted {} events from {} in {:.2}s",
        rows,
        input.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn run_clusterize(
    config: &AnalysisConfig,
    input: &[PathBuf],
    output: &Path,
    calibration: &Path,
    group: usize,
) -> Result<()> {
    let start = Instant::now();
    let table = load_calibration(calibration, config.calibration_format)?;
    let group = select_group(&table, group)?;
    let engine = StripClustering::new(config.clustering.clone())?;

    let mut clusters = ClusterTable::new();
    let mut total_events = 0usize;
    for path in input {
        let reader = TrbFileReader::open(path)?;
        let corrected = reader.read_corrected(group, Correction::Signal)?;
        let (file_clusters, state) = cluster_events(&corrected, &engine);
        // Event numbers continue across input files
        clusters.extend(file_clusters.into_iter().map(|mut c| {
            c.event += total_events;
            c
        }));

        log::info!(
            "{}: {} events, {} clusters, {} without seeds, {} over the seed limit",
            path.display(),
            state.events_processed,
            state.clusters_found,
            state.events_without_seeds,
            state.events_over_multiplicity
        );
        total_events += corrected.len();
    }

    let qualities: Vec<ClusterQuality> = clusters
        .iter()
        .map(|c| ClusterQuality::evaluate(c, group, config.strip_pitch_mm))
        .collect();
    let good = qualities.iter().filter(|q| q.good).count();
    let seed_snr: Vec<f64> = qualities.iter().filter_map(|q| q.seed_snr).collect();

    write_cluster_table(output, &clusters)?;

    println!(
        "Clustered {} events from {} file(s) in {:.2}s",
        total_events,
        input.len(),
        start.elapsed().as_secs_f64()
    );
    println!("Clusters: {} ({} good)", clusters.len(), good);
    if !seed_snr.is_empty() {
        println!(
            "Mean seed S/N: {:.2}",
            seed_snr.iter().sum::<f64>() / seed_snr.len() as f64
        );
    }
    Ok(())
}

fn frame_row(frame: &BoardFrame, calibration: Option<&CalibrationTable>) -> Result<Vec<f64>> {
    let mut row = Vec::with_capacity(frame.j7.len() + frame.j5.len());
    for (index, samples) in [&frame.j7, &frame.j5].into_iter().enumerate() {
        match calibration {
            Some(table) => row.extend(table.group(index)?.apply(samples, Correction::Signal)),
            None => row.extend(samples.iter().map(|&s| f64::from(s))),
        }
    }
    Ok(row)
}

fn run_listen(
    config: &AnalysisConfig,
    duration: Duration,
    max_frames: Option<usize>,
    output: Option<&Path>,
    calibration: Option<&Path>,
) -> Result<()> {
    let calibration = calibration
        .map(|path| load_calibration(path, config.calibration_format))
        .transpose()?;
    if let Some(table) = &calibration {
        if table.len() < 2 {
            return Err(CliError::Usage(format!(
                "live calibration needs a group per connector, found {}",
                table.len()
            )));
        }
    }
    let mut writer = output.map(EventArrayWriter::create).transpose()?;

    let receiver = UdpReceiver::spawn(&config.stream)?;
    println!("Listening on {}", receiver.local_addr());

    let deadline = Instant::now() + duration;
    let mut captured = 0usize;
    while receiver.is_running()
        && Instant::now() < deadline
        && max_frames.map_or(true, |max| captured < max)
    {
        match receiver.latest().take() {
            Some(frame) => {
                captured += 1;
                if let Some(writer) = writer.as_mut() {
                    writer.write_values(&frame_row(&frame, calibration.as_ref())?)?;
                }
                log::debug!("frame {} captured", frame.id);
            }
            None => thread::sleep(Duration::from_millis(5)),
        }
    }

    let stats = receiver.join()?;
    if let Some(writer) = writer {
        writer.finish()?;
    }
    println!(
        "Captured {} of {} frames ({} dropped boards, {} desync warnings)",
        captured, stats.frames, stats.dropped_boards, stats.desync_warnings
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { input, json } => run_info(&input, json)?,

        Commands::Convert {
            input,
            output,
            calibration,
            calibration_format,
            group,
            raw,
            keep_status_bits,
            ten_to_six,
        } => {
            let format = calibration_format.map_or(config.calibration_format, Into::into);
            let correction = if raw {
                Correction::Raw
            } else {
                Correction::Signal
            };
            let mode = if keep_status_bits {
                SampleMode::Verbatim
            } else {
                SampleMode::StripStatusBits
            };
            run_convert(
                &input,
                &output,
                calibration.as_deref(),
                format,
                group,
                correction,
                mode,
                ten_to_six,
            )?;
        }

        Commands::Clusterize {
            input,
            output,
            calibration,
            calibration_format,
            group,
            high,
            low,
            max_seeds,
            common_mode,
            symmetric,
            pitch,
        } => {
            if let Some(format) = calibration_format {
                config.calibration_format = format.into();
            }
            let clustering = &mut config.clustering;
            if let Some(high) = high {
                clustering.high_threshold = high;
            }
            if let Some(low) = low {
                clustering.low_threshold = low;
            }
            if let Some(max_seeds) = max_seeds {
                clustering.max_seeds = max_seeds;
            }
            if let Some(width) = symmetric {
                clustering.symmetric = true;
                clustering.symmetric_width = width;
            }
            if let Some(arg) = common_mode {
                let current = clustering.common_mode.unwrap_or_default();
                clustering.common_mode = match arg {
                    CommonModeArg::Adaptive => Some(CommonModePolicy::Adaptive),
                    CommonModeArg::FixedThreshold => Some(CommonModePolicy::FixedThreshold),
                    CommonModeArg::Guided => Some(CommonModePolicy::Guided),
                    CommonModeArg::None => None,
                }
                .map(|policy| CommonModeConfig { policy, ..current });
            }
            if let Some(pitch) = pitch {
                config.strip_pitch_mm = pitch;
            }
            config.validate()?;
            run_clusterize(&config, &input, &output, &calibration, group)?;
        }

        Commands::Listen {
            port,
            bind,
            duration,
            max_frames,
            output,
            calibration,
        } => {
            if let Some(port) = port {
                config.stream.port = port;
            }
            if let Some(bind) = bind {
                config.stream.bind_address = bind;
            }
            run_listen(
                &config,
                Duration::from_secs(duration),
                max_frames,
                output.as_deref(),
                calibration.as_deref(),
            )?;
        }
    }

    Ok(())
}
