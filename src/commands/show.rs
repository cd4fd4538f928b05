use std::path::PathBuf;

use clap::Args;

use crate::rules::{RulesSettings, apply_defaults};
use crate::store::RulesStore;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Rules file to show (defaults to the reconciled store)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Print the stored document without defaults applied
    #[arg(long)]
    pub raw: bool,
}

impl ShowArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let mut settings = match &self.rules {
            Some(path) => RulesSettings::load(path)?,
            None => RulesStore::default_location()?.load(),
        };
        if !self.raw {
            settings = apply_defaults(settings);
        }
        println!("{}", serde_json::to_string_pretty(&settings)?);
        Ok(())
    }
}
