use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::cli::OutputFormat;
use crate::config::Settings;
use crate::output::{print_plan, print_success};

pub async fn plan(
    settings: &Settings,
    path: &Path,
    refresh: bool,
    format: OutputFormat,
) -> Result<()> {
    let document = super::load_document(path)?;
    let mut engine = super::engine(settings, Some(&document))?;
    if refresh {
        engine.refresh().await?;
    }
    let plan = engine.plan(&document)?;
    print_plan(&plan, format)
}

pub async fn apply(settings: &Settings, path: &Path) -> Result<()> {
    let document = super::load_document(path)?;
    let mut engine = super::engine(settings, Some(&document))?;

    let report = engine.apply(&document).await?;

    for address in &report.deleted {
        println!("  {} {}", "-".red(), address.to_string().cyan());
    }
    for address in &report.created {
        println!("  {} {}", "+".green(), address.to_string().cyan());
    }
    for address in &report.updated {
        println!("  {} {}", "~".yellow(), address.to_string().cyan());
    }
    for address in &report.replaced {
        println!("  {} {}", "-/+".magenta(), address.to_string().cyan());
    }
    print_success(&format!("Apply complete: {report}"));
    Ok(())
}
