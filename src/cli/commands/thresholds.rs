//! `erw thresholds` command - regulatory limits for an element

use miette::Result;

use crate::cli::commands::context;
use crate::cli::output::{effective_format, render_thresholds, thresholds_to_delimited, to_structured};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct ThresholdsArgs {
    /// Element symbol, e.g. Ni (case-sensitive)
    pub element: String,
}

pub fn run(args: ThresholdsArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global, true)?;
    let buckets = ctx.service.get_thresholds(&args.element)?;

    let format = effective_format(global.format, true);
    let out = match format {
        OutputFormat::Yaml | OutputFormat::Json => to_structured(&buckets, format)?,
        OutputFormat::Csv | OutputFormat::Tsv => thresholds_to_delimited(&buckets, format)?,
        OutputFormat::Human | OutputFormat::Auto => render_thresholds(&args.element, &buckets),
    };

    print!("{}", out);
    if !out.ends_with('\n') {
        println!();
    }
    Ok(())
}
