//! Dataprep: get a raw image/label collection ready for detector training.
//!
//! The pipeline has three stages:
//!
//! - [`normalize`]: convert every image to RGB JPEG with EXIF orientation
//!   applied, in parallel, and audit which files did not make it;
//! - [`consistency`]: quarantine empty labels and images without labels so
//!   `images/` and `labels/` pair up one to one;
//! - [`split`]: write reproducible `train.csv` / `val.csv` / `test.csv`
//!   manifests from seeded, proportion-based partitioning.
//!
//! # Modules
//!
//! - [`vfs`]: filesystem abstraction (real disk and in-memory)
//! - [`config`]: YAML configuration and option resolution
//! - [`pipeline`]: stage orchestration
//! - [`error`]: error types for dataprep operations

pub mod config;
pub mod consistency;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod split;
pub mod vfs;

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::info;
use serde::Serialize;

pub use config::PipelineConfig;
pub use error::DataprepError;

use normalize::NormalizeOptions;
use vfs::OsFs;

/// The dataprep CLI application.
#[derive(Parser)]
#[command(name = "dataprep")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert images to JPEG and quarantine unpaired images and labels.
    Preprocess(PreprocessArgs),
    /// Write train/val/test manifests for the dataset.
    Split(SplitArgs),
    /// Preprocess, then split.
    Run(RunArgs),
}

/// Report output format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Configuration source and per-key overrides shared by all subcommands.
#[derive(clap::Args)]
struct ConfigArgs {
    /// YAML config file with `train:` and `split:` sections.
    #[arg(short, long, env = "DATAPREP_CONFIG")]
    config: Option<PathBuf>,

    /// Dataset root containing images/ and labels/.
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// Extra image directory to preprocess (its labels/ sibling is used).
    #[arg(long)]
    test_data: Option<PathBuf>,

    /// Conversion worker count.
    #[arg(long)]
    num_workers: Option<usize>,

    /// Seed for shuffling.
    #[arg(long)]
    seed: Option<u64>,

    /// Proportion of images for training.
    #[arg(long, value_parser = validate_fraction)]
    train_split: Option<f64>,

    /// Proportion of images for validation.
    #[arg(long, value_parser = validate_fraction)]
    val_split: Option<f64>,

    /// Leave images without a non-empty label out of the split.
    /// `--ignore-negatives false` turns a config-file `true` back off.
    #[arg(long, num_args = 0..=1, default_missing_value = "true",
          action = ArgAction::Set, value_name = "BOOL")]
    ignore_negatives: Option<bool>,

    /// Shuffle before assigning splits (`--shuffle false` keeps sorted order).
    #[arg(long, num_args = 0..=1, default_missing_value = "true",
          action = ArgAction::Set, value_name = "BOOL")]
    shuffle: Option<bool>,

    /// Assign splits in sorted order instead of shuffling.
    #[arg(long, conflicts_with = "shuffle")]
    no_shuffle: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Conversion settings.
#[derive(clap::Args)]
struct ConvertArgs {
    /// JPEG quality for converted images.
    #[arg(long, default_value_t = normalize::DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Do not draw a progress bar.
    #[arg(long)]
    no_progress: bool,
}

/// Arguments for the preprocess subcommand.
#[derive(clap::Args)]
struct PreprocessArgs {
    #[command(flatten)]
    common: ConfigArgs,

    #[command(flatten)]
    convert: ConvertArgs,

    /// Report what would change without touching any file.
    #[arg(long)]
    dry_run: bool,
}

/// Arguments for the split subcommand.
#[derive(clap::Args)]
struct SplitArgs {
    #[command(flatten)]
    common: ConfigArgs,
}

/// Arguments for the run subcommand.
#[derive(clap::Args)]
struct RunArgs {
    #[command(flatten)]
    common: ConfigArgs,

    #[command(flatten)]
    convert: ConvertArgs,
}

impl ConfigArgs {
    /// Load the config file (if any), apply overrides and validate.
    fn resolve(&self) -> Result<PipelineConfig, DataprepError> {
        let mut config = match &self.config {
            Some(path) => config::load_config(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(path) = &self.data_path {
            config.train.data_path = path.clone();
        }
        if let Some(path) = &self.test_data {
            config.train.path_to_test_data = Some(path.clone());
        }
        if let Some(workers) = self.num_workers {
            config.train.num_workers = Some(workers);
        }
        if let Some(seed) = self.seed {
            config.train.seed = seed;
        }
        if let Some(train) = self.train_split {
            config.split.train_split = train;
        }
        if let Some(val) = self.val_split {
            config.split.val_split = val;
        }
        if let Some(ignore) = self.ignore_negatives {
            config.split.ignore_negatives = ignore;
        }
        if let Some(shuffle) = self.shuffle {
            config.split.shuffle = shuffle;
        }
        if self.no_shuffle {
            config.split.shuffle = false;
        }

        config.validate()?;
        Ok(config)
    }
}

impl ConvertArgs {
    fn options(&self, config: &PipelineConfig, dry_run: bool) -> NormalizeOptions {
        NormalizeOptions {
            jpeg_quality: self.jpeg_quality,
            dry_run,
            progress: !self.no_progress,
            ..config.normalize_options()
        }
    }
}

// Validate that a fraction is between 0.0 and 1.0
fn validate_fraction(s: &str) -> Result<f64, String> {
    match f64::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("fraction must be between 0.0 and 1.0".to_string()),
    }
}

/// Run the dataprep CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), DataprepError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Preprocess(args)) => run_preprocess(args),
        Some(Commands::Split(args)) => run_split(args),
        Some(Commands::Run(args)) => run_all(args),
        None => {
            println!("dataprep {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Normalize, clean and split image/label datasets.");
            println!();
            println!("Run 'dataprep --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the preprocess subcommand.
fn run_preprocess(args: PreprocessArgs) -> Result<(), DataprepError> {
    let config = args.common.resolve()?;
    let opts = args.convert.options(&config, args.dry_run);

    info!("Preprocessing {}", config.train.data_path.display());
    let report = pipeline::preprocess(&OsFs, &config, &opts)?;
    emit(&report, args.common.output)
}

/// Execute the split subcommand.
fn run_split(args: SplitArgs) -> Result<(), DataprepError> {
    let config = args.common.resolve()?;

    info!("Splitting {}", config.train.data_path.display());
    let report = pipeline::split(&OsFs, &config)?;
    emit(&report, args.common.output)
}

/// Execute the run subcommand.
fn run_all(args: RunArgs) -> Result<(), DataprepError> {
    let config = args.common.resolve()?;
    let opts = args.convert.options(&config, false);

    info!("Running full pipeline on {}", config.train.data_path.display());
    let report = pipeline::run(&OsFs, &config, &opts)?;
    emit(&report, args.common.output)
}

/// Print a report in the requested format.
fn emit<R: Display + Serialize>(report: &R, format: OutputFormat) -> Result<(), DataprepError> {
    match format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}
