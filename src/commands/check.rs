use std::path::PathBuf;

use clap::Args;

use crate::rules::RulesSettings;
use crate::store::RulesStore;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Rules file to validate (defaults to the reconciled store)
    #[arg(long)]
    pub rules: Option<PathBuf>,
}

impl CheckArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let settings = match &self.rules {
            Some(path) => RulesSettings::load(path)?,
            None => {
                let settings = RulesStore::default_location()?.load();
                settings.validate()?;
                settings
            }
        };
        let rule_count: usize = settings.apps.iter().map(|app| app.rules.len()).sum();
        println!("ok: {} app(s), {rule_count} rule(s)", settings.apps.len());
        Ok(())
    }
}
