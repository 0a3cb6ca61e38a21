//! Plan command - show the knock sequence without sending it.

use std::fmt::Write;
use std::path::Path;

use anyhow::Result;
use kexec_core::{ConfigStore, HostMatch, KnockStep, Sequence};
use serde_json::{json, Value};

pub async fn run(store: &ConfigStore, host: &str, mode: HostMatch, json: bool) -> Result<()> {
    let sequence = store.sequence_for(host, mode).await?;
    println!("{}", render(&sequence, store.config_path(), json)?);
    Ok(())
}

/// Render the whole plan, or fail on the first malformed token.
pub fn render(sequence: &Sequence, config: &Path, json: bool) -> Result<String> {
    let steps = sequence.parse_all()?;

    if json {
        let plan = plan_json(sequence.host(), config, &steps);
        return Ok(serde_json::to_string_pretty(&plan)?);
    }
    Ok(plan_table(sequence.host(), &steps))
}

pub fn plan_json(host: &str, config: &Path, steps: &[KnockStep]) -> Value {
    json!({
        "host": host,
        "config": config.display().to_string(),
        "steps": steps,
    })
}

pub fn plan_table(host: &str, steps: &[KnockStep]) -> String {
    if steps.is_empty() {
        return format!("No knocks configured for {}.", host);
    }

    // Table header
    let mut out = format!("{:<4} {:<6} PORT\n{}\n", "#", "PROTO", "-".repeat(20));
    for (idx, step) in steps.iter().enumerate() {
        let _ = writeln!(out, "{:<4} {:<6} {}", idx + 1, step.protocol.as_str(), step.port);
    }
    let _ = write!(out, "\nTotal: {} knocks to {}", steps.len(), host);
    out
}
