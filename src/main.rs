use clap::Parser;
use erw::cli::{commands, Cli, Commands};
use miette::Result;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    // RUST_LOG, when set, overrides -v/-q
    env_logger::Builder::new()
        .filter_level(cli.global.log_level())
        .format_timestamp(None)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Elements(args) => commands::elements::run(args, &cli.global),
        Commands::Preset(args) => commands::preset::run(args, &cli.global),
        Commands::Custom(args) => commands::custom::run(args, &cli.global),
        Commands::Thresholds(args) => commands::thresholds::run(args, &cli.global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
