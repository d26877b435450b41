//! Command-line arguments

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::completions::CompletionsArgs;
use crate::cli::commands::custom::CustomArgs;
use crate::cli::commands::elements::ElementsArgs;
use crate::cli::commands::preset::PresetArgs;
use crate::cli::commands::thresholds::ThresholdsArgs;
use crate::core::simulate::DepthFloorPolicy;

/// Heavy-metal uplift forecasting for enhanced rock weathering
#[derive(Parser, Debug)]
#[command(name = "erw", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value = "auto")]
    pub format: OutputFormat,

    /// Directory holding the reference CSV tables
    #[arg(long, global = true, env = "ERW_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Samples per distribution
    #[arg(long, short = 'n', global = true)]
    pub samples: Option<usize>,

    /// Seed the random source for reproducible output
    #[arg(long, global = true, env = "ERW_SEED")]
    pub seed: Option<u64>,

    /// How sampled soil depths are floored at 1 m
    #[arg(long, global = true, value_enum)]
    pub depth_floor_policy: Option<DepthFloorPolicy>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl GlobalOpts {
    /// Log filter implied by -v/-q
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the elements modelled for a feedstock type
    Elements(ElementsArgs),

    /// Forecast preset application rates with inputs fitted from reference data
    Preset(PresetArgs),

    /// Forecast one application rate from your own mean and uncertainty values
    Custom(CustomArgs),

    /// Show regulatory thresholds for an element
    Thresholds(ThresholdsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable for terminals; YAML for reports
    Auto,
    Yaml,
    Json,
    Csv,
    Tsv,
    /// Styled tables and plots
    Human,
}
