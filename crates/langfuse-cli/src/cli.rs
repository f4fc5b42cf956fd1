use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "langfuse-provider")]
#[command(about = "Reconcile Langfuse organizations, projects and API keys with a desired-state document")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Langfuse host URL (overrides config file)
    #[arg(long, global = true, env = "LANGFUSE_HOST")]
    pub host: Option<String>,

    /// Instance admin API key, needed for organizations and their keys
    #[arg(long, global = true, env = "LANGFUSE_ADMIN_KEY", hide_env_values = true)]
    pub admin_api_key: Option<String>,

    /// Path to config file (defaults to ./langfuse.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the state file
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show what apply would change
    Plan(PlanArgs),
    /// Create, update and delete resources to match the document
    Apply(DocumentArgs),
    /// Read every recorded resource back and drop the ones that are gone
    Refresh,
    /// Delete every recorded resource
    Destroy,
    /// Print the recorded state (secrets masked)
    Show(ShowArgs),
    /// Check a document without contacting the API
    Validate(DocumentArgs),
}

#[derive(clap::Args)]
pub struct DocumentArgs {
    /// Desired-state document (TOML)
    pub document: PathBuf,
}

#[derive(clap::Args)]
pub struct PlanArgs {
    /// Desired-state document (TOML)
    pub document: PathBuf,
    /// Plan against the recorded state without reading the API first
    #[arg(long)]
    pub no_refresh: bool,
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(clap::Args)]
pub struct ShowArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}
