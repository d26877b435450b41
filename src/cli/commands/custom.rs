//! `erw custom` command - forecast one rate from caller-supplied inputs

use miette::Result;

use crate::cli::commands::context;
use crate::cli::output::print_report;
use crate::cli::GlobalOpts;
use crate::core::CustomParameters;

#[derive(clap::Args, Debug)]
pub struct CustomArgs {
    /// Element symbol, e.g. Ni
    #[arg(long, short = 'e')]
    pub element: String,

    /// Feedstock type (basalt or peridotite)
    #[arg(long, short = 't')]
    pub feedstock: String,

    /// Feedstock concentration (mg/kg)
    #[arg(long, allow_negative_numbers = true)]
    pub feed_conc: f64,

    /// Feedstock concentration standard deviation (mg/kg)
    #[arg(long, allow_negative_numbers = true)]
    pub feed_conc_sd: f64,

    /// Background soil concentration (mg/kg)
    #[arg(long, allow_negative_numbers = true)]
    pub soil_conc: f64,

    /// Background soil concentration standard deviation (mg/kg)
    #[arg(long, allow_negative_numbers = true)]
    pub soil_conc_sd: f64,

    /// Soil bulk density (kg/m³)
    #[arg(long, allow_negative_numbers = true)]
    pub bulk_density: f64,

    /// Soil bulk density standard deviation (kg/m³)
    #[arg(long, allow_negative_numbers = true)]
    pub bulk_density_sd: f64,

    /// Soil mixing depth (m)
    #[arg(long, allow_negative_numbers = true)]
    pub soil_depth: f64,

    /// Soil mixing depth standard deviation (m)
    #[arg(long, allow_negative_numbers = true)]
    pub soil_depth_sd: f64,

    /// Application rate (t/ha)
    #[arg(long, short = 'r', allow_negative_numbers = true)]
    pub application_rate: f64,

    /// Include regulatory thresholds (needs the reference tables)
    #[arg(long)]
    pub thresholds: bool,

    /// Draw density curves (human output only)
    #[arg(long, short = 'p')]
    pub plot: bool,
}

impl From<&CustomArgs> for CustomParameters {
    fn from(args: &CustomArgs) -> Self {
        CustomParameters {
            element: args.element.clone(),
            feedstock_type: args.feedstock.clone(),
            feed_conc: args.feed_conc,
            feed_conc_sd: args.feed_conc_sd,
            soil_conc: args.soil_conc,
            soil_conc_sd: args.soil_conc_sd,
            bulk_density: args.bulk_density,
            bulk_density_sd: args.bulk_density_sd,
            soil_depth: args.soil_depth,
            soil_depth_sd: args.soil_depth_sd,
            application_rate: args.application_rate,
        }
    }
}

pub fn run(args: CustomArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = context(global, args.thresholds)?;
    let params = CustomParameters::from(&args);
    let report = ctx
        .service
        .compute_custom(&params, args.thresholds, &mut ctx.rng)?;
    print_report(&report, global.format, args.plot)
}
