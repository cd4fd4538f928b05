use schemars::schema_for;

use crate::rules::RulesSettings;

/// Print the JSON Schema for the rules document to stdout.
pub fn run_schema() -> anyhow::Result<()> {
    let schema = schema_for!(RulesSettings);
    let json = serde_json::to_string_pretty(&schema)?;
    println!("{json}");
    Ok(())
}
