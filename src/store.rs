//! Two-replica rules storage: a local copy and a synced copy, reconciled
//! by modification time on load.
//!
//! Each replica is a key-value store holding one JSON document under the
//! `rules` key, which here means a `rules.json` file per replica
//! directory. Saving validates, stamps `dateModified`, and writes both
//! replicas so they converge again.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::error::ExitError;
use crate::rules::{RulesSettings, check_rules, default_rules};

/// Key under which the settings document is stored in each replica.
pub const RULES_KEY: &str = "rules";

/// Pick the newer of two optional timestamped values.
///
/// A timestamped value beats an untimestamped one; when both carry
/// timestamps the newer wins; a tie keeps the local copy. A value present
/// in only one replica wins outright.
pub fn pick_newer<T>(
    local: Option<(Option<DateTime<Utc>>, T)>,
    synced: Option<(Option<DateTime<Utc>>, T)>,
) -> Option<T> {
    match (local, synced) {
        (None, None) => None,
        (Some((_, local)), None) => Some(local),
        (None, Some((_, synced))) => Some(synced),
        (Some((local_at, local)), Some((synced_at, synced))) => match (local_at, synced_at) {
            (None, Some(_)) => Some(synced),
            (Some(local_at), Some(synced_at)) if synced_at > local_at => Some(synced),
            _ => Some(local),
        },
    }
}

/// File-backed replica pair.
#[derive(Debug, Clone)]
pub struct RulesStore {
    local: PathBuf,
    synced: PathBuf,
}

impl RulesStore {
    pub fn new(local: PathBuf, synced: PathBuf) -> Self {
        Self { local, synced }
    }

    /// Store rooted at a single directory, one subdirectory per replica.
    pub fn in_dir(dir: &Path) -> Self {
        let file = format!("{RULES_KEY}.json");
        Self::new(dir.join("local").join(&file), dir.join("sync").join(file))
    }

    /// Store under the user's platform config directory.
    pub fn default_location() -> anyhow::Result<Self> {
        let base = dirs::config_dir()
            .context("no config directory for this platform")?
            .join("onreply");
        Ok(Self::in_dir(&base))
    }

    pub fn local_path(&self) -> &Path {
        &self.local
    }

    /// Whether either replica already has data.
    pub fn exists(&self) -> bool {
        self.local.exists() || self.synced.exists()
    }

    fn read_replica(path: &Path) -> Option<(Option<DateTime<Utc>>, RulesSettings)> {
        let contents = std::fs::read_to_string(path).ok()?;
        match RulesSettings::parse_json(&contents) {
            Ok(settings) => Some((settings.date_modified, settings)),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring unreadable replica");
                None
            }
        }
    }

    /// Load both replicas and return the winner, falling back to the
    /// built-in defaults when neither has data.
    pub fn load(&self) -> RulesSettings {
        pick_newer(
            Self::read_replica(&self.local),
            Self::read_replica(&self.synced),
        )
        .unwrap_or_else(default_rules)
    }

    /// Validate, stamp `dateModified`, and write both replicas.
    pub fn save(&self, settings: RulesSettings) -> anyhow::Result<()> {
        self.save_at(settings, Utc::now())
    }

    fn save_at(&self, mut settings: RulesSettings, now: DateTime<Utc>) -> anyhow::Result<()> {
        let raw = serde_json::to_value(&settings)?;
        check_rules(&raw).map_err(|e| ExitError::Config(e.to_string()))?;
        settings.date_modified = Some(now);
        let json = serde_json::to_string_pretty(&settings)?;
        for path in [&self.local, &self.synced] {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(path, &json).with_context(|| format!("writing {}", path.display()))?;
        }
        Ok(())
    }
}
