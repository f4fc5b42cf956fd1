use anyhow::Result;
use colored::Colorize;

use crate::cli::OutputFormat;
use crate::config::Settings;
use crate::output::{print_json, print_success, state_json, state_table};

pub async fn refresh(settings: &Settings) -> Result<()> {
    let mut engine = super::engine(settings, None)?;
    let report = engine.refresh().await?;

    for address in &report.removed {
        println!("  {} {} (no longer exists)", "-".red(), address.to_string().cyan());
    }
    for address in &report.drifted {
        println!("  {} {} (updated from remote)", "~".yellow(), address.to_string().cyan());
    }
    print_success(&format!(
        "Refreshed {} resources: {} unchanged, {} updated, {} removed",
        report.unchanged.len() + report.drifted.len() + report.removed.len(),
        report.unchanged.len(),
        report.drifted.len(),
        report.removed.len()
    ));
    Ok(())
}

pub async fn destroy(settings: &Settings) -> Result<()> {
    let mut engine = super::engine(settings, None)?;
    if engine.state().is_empty() {
        print_success("Nothing to destroy.");
        return Ok(());
    }

    let destroyed = engine.destroy().await?;
    for address in &destroyed {
        println!("  {} {}", "-".red(), address.to_string().cyan());
    }
    print_success(&format!("Destroyed {} resources", destroyed.len()));
    Ok(())
}

pub fn show(settings: &Settings, format: OutputFormat) -> Result<()> {
    let state = super::load_state(settings)?;
    match format {
        OutputFormat::Json => print_json(&state_json(&state))?,
        OutputFormat::Table => {
            if state.is_empty() {
                println!("No resources recorded in {}.", state.path().display());
                return Ok(());
            }
            println!("{}", state_table(&state));
            println!(
                "{}: {}  {}: {}",
                "Serial".cyan(),
                state.serial(),
                "Updated".cyan(),
                state.updated_at().unwrap_or("-")
            );
        }
    }
    Ok(())
}
