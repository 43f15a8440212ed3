//! Command-line interface of `autoqc`, defined with `clap` derive.

use crate::statistics::{Granularity, SmoothingKind};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Automated quality control of climate model output
#[derive(Parser, Debug)]
#[command(
    version,
    name = "autoqc",
    about = "Automated QC checks for gridded climate model output"
)]
pub struct Args {
    /// Enable verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Print the report as JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the numeric checks on one variable
    Data(DataArgs),
    /// Compare a file's metadata and structure with a reference file
    Metadata(MetadataArgs),
}

#[derive(clap::Args, Debug)]
pub struct DataArgs {
    /// Path to the NetCDF file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Variable to check
    #[arg(long)]
    pub variable: String,

    /// Name of the x (longitude) dimension
    #[arg(long, default_value = "lon")]
    pub x: String,

    /// Name of the y (latitude) dimension
    #[arg(long, default_value = "lat")]
    pub y: String,

    /// Name of the z (depth) dimension
    #[arg(long, default_value = "lev")]
    pub z: String,

    /// Name of the time dimension
    #[arg(long, default_value = "time")]
    pub time: String,

    /// Missing value marker; defaults to the variable's fill value, then 1e15
    #[arg(long)]
    pub spval: Option<f64>,

    /// Allowed mask size band around the expected land fraction, as <low>,<high>
    #[arg(long, value_parser = parse_band_arg, default_value = "0.5,1.5")]
    pub band: (f64, f64),

    /// Expected fraction of masked points per level
    #[arg(long, default_value_t = crate::mask::LAND_FRACTION)]
    pub expected_fraction: f64,

    /// Output frequency tag (e.g. mon, day); defaults to the `frequency` attribute
    #[arg(long)]
    pub frequency: Option<String>,

    /// File holding the cell area/volume weights; defaults to the data file
    #[arg(long)]
    pub weights: Option<PathBuf>,

    /// Name of the cell area variable
    #[arg(long, default_value = "areacello")]
    pub area: String,

    /// Name of the cell volume variable
    #[arg(long, default_value = "volcello")]
    pub volume: String,

    /// Directory for summary and outlier chart files. Nothing is written if not set.
    #[arg(long)]
    pub outdir: Option<PathBuf>,

    /// Grouping of the summary statistics
    #[arg(long, value_enum, default_value_t = GroupingArg::Timestep)]
    pub granularity: GroupingArg,

    /// Compare each group's mean and std with the first one
    #[arg(long, default_value_t = false)]
    pub compare_first_year: bool,

    /// Baseline smoother of the outlier detector
    #[arg(long, value_enum, default_value_t = SmoothingArg::Exponential)]
    pub smoothing: SmoothingArg,

    /// Smoothing window of the outlier detector, in timesteps
    #[arg(long, default_value_t = 12)]
    pub window: usize,

    /// Outlier threshold in standard deviations [default: 3, or 2 with the moving average]
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct MetadataArgs {
    /// Path to the NetCDF file under test
    #[arg(short, long)]
    pub file: PathBuf,

    /// Path to the reference NetCDF file
    #[arg(short, long)]
    pub reference: PathBuf,

    /// Name of the time coordinate, compared for presence only
    #[arg(long, default_value = "time")]
    pub time: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupingArg {
    Timestep,
    Year,
}

impl From<GroupingArg> for Granularity {
    fn from(arg: GroupingArg) -> Self {
        match arg {
            GroupingArg::Timestep => Granularity::Timestep,
            GroupingArg::Year => Granularity::Year,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmoothingArg {
    Exponential,
    MovingAverage,
}

impl From<SmoothingArg> for SmoothingKind {
    fn from(arg: SmoothingArg) -> Self {
        match arg {
            SmoothingArg::Exponential => SmoothingKind::Exponential,
            SmoothingArg::MovingAverage => SmoothingKind::CenteredMovingAverage,
        }
    }
}

fn parse_band_arg(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split(',').collect();
    match parts.as_slice() {
        [low, high] => {
            let low = low
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid lower bound '{}'", low))?;
            let high = high
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid upper bound '{}'", high))?;
            if low > high {
                return Err(format!("Lower bound {} exceeds upper bound {}", low, high));
            }
            Ok((low, high))
        }
        _ => Err("Invalid format: Expected '<low>,<high>'.".to_string()),
    }
}
