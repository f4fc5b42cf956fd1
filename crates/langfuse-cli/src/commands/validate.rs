use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use langfuse_provider::validate_document;

use crate::output::print_success;

pub fn validate(path: &Path) -> Result<()> {
    let document = super::load_document(path)?;
    validate_document(&document)?;
    print_success(&format!(
        "{} is valid ({} resources)",
        path.display().to_string().cyan(),
        document.len()
    ));
    Ok(())
}
