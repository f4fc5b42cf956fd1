use anyhow::Result;
use colored::{ColoredString, Colorize};
use langfuse_provider::{Action, Plan, StateStore};
use serde_json::{Value, json};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

/// Attributes never printed in clear.
const SENSITIVE: [&str; 2] = ["secret_key", "organization_private_key"];
const MASK: &str = "(sensitive)";

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn mask_secrets(attributes: &Value) -> Value {
    match attributes {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if SENSITIVE.contains(&k.as_str()) && !v.is_null() {
                        Value::String(MASK.to_string())
                    } else {
                        v.clone()
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn symbol(action: Action) -> ColoredString {
    let symbol = action.symbol();
    match action {
        Action::Create => symbol.green(),
        Action::Update => symbol.yellow(),
        Action::Replace => symbol.magenta(),
        Action::Delete => symbol.red(),
        Action::NoChange => symbol.normal(),
    }
}

pub fn print_plan(plan: &Plan, format: OutputFormat) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        return print_json(&json!({
            "changes": plan.changes,
            "summary": plan.summary(),
        }));
    }

    if !plan.has_changes() {
        print_success("No changes. Langfuse matches the document.");
        return Ok(());
    }

    for change in plan.changes.iter().filter(|c| c.action.is_change()) {
        let mut line = format!("  {} {}", symbol(change.action), change.address.to_string().cyan());
        if !change.unknown.is_empty() {
            line.push_str(&format!(
                "  ({} known after apply)",
                change.unknown.join(", ")
            ));
        }
        println!("{line}");
    }
    println!();
    println!("{} {}", "Plan:".bold(), plan.summary());
    Ok(())
}

fn details(attributes: &Value) -> String {
    let Value::Object(map) = mask_secrets(attributes) else {
        return String::new();
    };
    map.iter()
        .filter(|(k, _)| k.as_str() != "id")
        .map(|(k, v)| match v {
            Value::String(s) => format!("{k}={s}"),
            other => format!("{k}={other}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn state_table(state: &StateStore) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Address", "ID", "Attributes"]);
    for (address, record) in state.records() {
        let id = record
            .attributes
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        builder.push_record([address.to_string(), id.to_string(), details(&record.attributes)]);
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn state_json(state: &StateStore) -> Value {
    let resources: serde_json::Map<String, Value> = state
        .records()
        .map(|(address, record)| {
            (
                address.to_string(),
                json!({
                    "kind": record.kind,
                    "attributes": mask_secrets(&record.attributes),
                }),
            )
        })
        .collect();
    json!({
        "lineage": state.lineage(),
        "serial": state.serial(),
        "updated_at": state.updated_at(),
        "resources": resources,
    })
}
