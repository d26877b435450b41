//! CLI command implementations

pub mod completions;
pub mod custom;
pub mod elements;
pub mod preset;
pub mod thresholds;

use miette::Result;
use rand::rngs::StdRng;
use std::sync::Arc;

use crate::cli::helpers::command_rng;
use crate::cli::GlobalOpts;
use crate::core::{AnalysisService, Config, ReferenceTables};

/// Everything a command needs to run one analysis
pub struct CommandContext {
    pub service: AnalysisService,
    pub rng: StdRng,
}

/// Apply command-line overrides on top of the file configuration
pub fn resolve_config(global: &GlobalOpts) -> Result<Config> {
    let mut config = Config::load()?;

    if let Some(dir) = &global.data_dir {
        config.data.dir = dir.clone();
    }
    if let Some(samples) = global.samples {
        config.simulation.sample_count = samples;
    }
    if let Some(seed) = global.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(policy) = global.depth_floor_policy {
        config.simulation.depth_floor_policy = policy;
    }

    config.validate()?;
    Ok(config)
}

/// Build the service, loading the reference tables only when needed
pub fn context(global: &GlobalOpts, needs_tables: bool) -> Result<CommandContext> {
    let config = resolve_config(global)?;

    let tables: Option<Arc<ReferenceTables>> = if needs_tables {
        Some(ReferenceTables::load(&config).map_err(|e| {
            miette::miette!(
                help = "set --data-dir or ERW_DATA_DIR to the directory holding the CSV tables",
                "{}: {}",
                e,
                std::error::Error::source(&e)
                    .map(ToString::to_string)
                    .unwrap_or_default()
            )
        })?)
    } else {
        None
    };

    let rng = command_rng(config.simulation.seed);
    let service = AnalysisService::new(tables, config.simulation);

    Ok(CommandContext { service, rng })
}
