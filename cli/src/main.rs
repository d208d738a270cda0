use clap::Parser;

mod commands;
mod logging;

use codepact_core::api::CliError;
use commands::cli;

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let args = cli::Args::parse();
    let cfg = commands::load_config(args.config.as_deref())?;
    let log_guard = logging::init(&cfg.logging);

    let code = match args.command {
        cli::Commands::Validate(v) => commands::handle_validate(v, &cfg).await?,
        cli::Commands::Convert(c) => commands::handle_convert(c, &cfg).await?,
        cli::Commands::Tools(t) => commands::handle_tools(t)?,
    };

    if code != 0 {
        // exit skips destructors, so flush file logs first
        drop(log_guard);
        std::process::exit(code);
    }
    Ok(())
}
