use std::path::PathBuf;

use clap::Args;
use serde_json::Value;

use crate::handler::{Engine, RuleMatcher, handle_all};
use crate::rules::{RulesSettings, apply_defaults};
use crate::send::{Headers, HttpSink, MessageSink, NullSink};
use crate::store::RulesStore;

#[derive(Debug, Args)]
pub struct RespondArgs {
    /// URL of the intercepted polling request
    #[arg(long)]
    pub url: String,

    /// Response body JSON (defaults to stdin)
    #[arg(long)]
    pub body: Option<PathBuf>,

    /// Captured request headers as a JSON object
    #[arg(long)]
    pub headers: Option<PathBuf>,

    /// Rules file (defaults to the reconciled store)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// POST matched replies instead of doing a dry run
    #[arg(long)]
    pub send: bool,
}

impl RespondArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let settings = match &self.rules {
            Some(path) => RulesSettings::load(path)?,
            None => RulesStore::default_location()?.load(),
        };
        let settings = apply_defaults(settings);

        let body: Value = match &self.body {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => serde_json::from_reader(std::io::stdin().lock())?,
        };
        let headers: Headers = match &self.headers {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => Headers::new(),
        };

        let http_sink = HttpSink;
        let null_sink = NullSink;
        let sink: &dyn MessageSink = if self.send { &http_sink } else { &null_sink };
        let matcher = RuleMatcher;
        let engine = Engine::new(&matcher, sink);

        let result = handle_all(&engine, &self.url, &body, &headers, &settings);
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    }
}
