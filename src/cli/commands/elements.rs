//! `erw elements` command - list the elements modelled for a feedstock

use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::output::{effective_format, to_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::AnalysisService;

#[derive(clap::Args, Debug)]
pub struct ElementsArgs {
    /// Feedstock type (basalt or peridotite)
    pub feedstock: String,
}

#[derive(Serialize)]
struct ElementList<'a> {
    elements: &'a [&'a str],
}

pub fn run(args: ElementsArgs, global: &GlobalOpts) -> Result<()> {
    // The element lists are fixed; no tables or config needed
    let service = AnalysisService::new(None, Default::default());
    let elements = service.list_elements(&args.feedstock)?;

    let format = effective_format(global.format, true);
    match format {
        OutputFormat::Yaml | OutputFormat::Json => {
            let out = to_structured(&ElementList { elements }, format)?;
            print!("{}", out);
            if !out.ends_with('\n') {
                println!();
            }
        }
        OutputFormat::Csv | OutputFormat::Tsv => {
            for element in elements {
                println!("{}", element);
            }
        }
        OutputFormat::Human | OutputFormat::Auto => {
            println!(
                "{} {}:",
                style("Elements for").bold(),
                style(args.feedstock.trim().to_lowercase()).yellow()
            );
            println!("  {}", elements.join("  "));
        }
    }

    Ok(())
}
