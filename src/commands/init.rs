use std::path::PathBuf;

use clap::Args;

use crate::error::ExitError;
use crate::rules::default_rules;
use crate::store::RulesStore;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite replicas that already have data
    #[arg(long)]
    pub force: bool,

    /// Store directory (defaults to the platform config directory)
    #[arg(long)]
    pub store_dir: Option<PathBuf>,
}

impl InitArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let store = match &self.store_dir {
            Some(dir) => RulesStore::in_dir(dir),
            None => RulesStore::default_location()?,
        };
        if store.exists() && !self.force {
            return Err(ExitError::Config(
                "rules already initialized (use --force to overwrite)".into(),
            )
            .into());
        }
        store.save(default_rules())?;
        println!("wrote default rules to {}", store.local_path().display());
        Ok(())
    }
}
