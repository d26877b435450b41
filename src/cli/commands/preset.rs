//! `erw preset` command - forecast the preset rates from reference data

use miette::Result;

use crate::cli::commands::context;
use crate::cli::output::print_report;
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct PresetArgs {
    /// Element symbol, e.g. Ni
    #[arg(long, short = 'e')]
    pub element: String,

    /// Feedstock type (basalt or peridotite)
    #[arg(long, short = 't')]
    pub feedstock: String,

    /// Include regulatory thresholds and the share of outcomes above each
    #[arg(long)]
    pub thresholds: bool,

    /// Draw density curves (human output only)
    #[arg(long, short = 'p')]
    pub plot: bool,
}

pub fn run(args: PresetArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = context(global, true)?;
    let report = ctx.service.compute_preset(
        &args.element,
        &args.feedstock,
        args.thresholds,
        &mut ctx.rng,
    )?;
    print_report(&report, global.format, args.plot)
}
