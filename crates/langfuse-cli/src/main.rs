mod cli;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    // .env must be loaded before clap reads LANGFUSE_HOST / LANGFUSE_ADMIN_KEY.
    let _ = dotenvy::dotenv();

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::loader::load_for_cli(&cli)?;
    observability::init_tracing_with_level(&settings.logging.level);

    match &cli.command {
        Commands::Plan(args) => {
            commands::plan::plan(&settings, &args.document, !args.no_refresh, args.format).await?;
        }
        Commands::Apply(args) => {
            commands::plan::apply(&settings, &args.document).await?;
        }
        Commands::Refresh => {
            commands::state::refresh(&settings).await?;
        }
        Commands::Destroy => {
            commands::state::destroy(&settings).await?;
        }
        Commands::Show(args) => {
            commands::state::show(&settings, args.format)?;
        }
        Commands::Validate(args) => {
            commands::validate::validate(&args.document)?;
        }
    }

    Ok(())
}
