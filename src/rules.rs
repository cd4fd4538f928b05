//! Rule model: the user-authored response rules, validation, and the
//! built-in per-app defaults.
//!
//! The stored document uses camelCase keys; TOML is accepted as an
//! authoring convenience (auto-detected by extension) but the replicas
//! themselves are always JSON.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExitError, RulesError};

/// One response rule: a trigger (exact text or regex) plus reply templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Triggers when the incoming message equals this exactly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_exact_match: Option<String>,

    /// Triggers when this pattern tests true against the incoming message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_pattern: Option<String>,

    /// Flags for `messagePattern`: `i`, `m`, `s`, and `x` are honored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_flags: Option<String>,

    /// A random item from this list will be selected.
    #[serde(default)]
    pub responses: Vec<String>,
}

/// Rules and field locations for one chat application.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppRules {
    /// App identifier, e.g. `"teams"`.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,

    /// Regex matched against the response URL to decide whether this
    /// app's rules apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,

    /// Reply endpoint template; every `{{toId}}` is substituted per message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_url: Option<String>,

    /// Where to find candidate events in a response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_path: Option<String>,

    /// Sender contact URL, relative to one event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_from_url_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_compose_time_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_display_name_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_to_id_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_message_text_path: Option<String>,

    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl AppRules {
    /// Whether this app's rules apply to a response from `url`.
    /// The pattern is tested case-insensitively, and an app with no
    /// pattern never applies.
    pub fn matches_url(&self, url: &str) -> bool {
        let Some(pattern) = self.url_pattern.as_deref() else {
            return false;
        };
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(re) => re.is_match(url),
            Err(err) => {
                tracing::warn!(app = %self.name, %err, "invalid urlPattern");
                false
            }
        }
    }
}

/// Top-level settings document: one entry per app plus the replica
/// timestamp used for conflict resolution.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RulesSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<DateTime<Utc>>,

    pub apps: Vec<AppRules>,
}

impl RulesSettings {
    /// Load a rules file (TOML or JSON, auto-detected by extension).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "toml" => Self::parse_toml(&contents),
            "json" => Self::parse_json(&contents),
            _ => Self::parse_toml(&contents).or_else(|_| Self::parse_json(&contents)),
        }
    }

    /// Parse and validate a JSON rules document. Validation runs against
    /// the raw value, so a malformed document fails with a message naming
    /// the offending app and rule rather than a deserializer error.
    pub fn parse_json(json: &str) -> anyhow::Result<Self> {
        let raw: Value = serde_json::from_str(json)
            .map_err(|e| ExitError::Config(format!("invalid rules JSON: {e}")))?;
        check_rules(&raw).map_err(|e| ExitError::Config(e.to_string()))?;
        let settings = serde_json::from_value(raw)
            .map_err(|e| ExitError::Config(format!("invalid rules JSON: {e}")))?;
        Ok(settings)
    }

    /// Parse and validate a TOML rules document. `dateModified` must be a
    /// quoted RFC 3339 string.
    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        let settings: Self = toml::from_str(toml_str)
            .map_err(|e| ExitError::Config(format!("invalid rules TOML: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Re-check the structural invariants on an already-typed value.
    pub fn validate(&self) -> anyhow::Result<()> {
        let raw = serde_json::to_value(self)?;
        check_rules(&raw).map_err(|e| ExitError::Config(e.to_string()))?;
        Ok(())
    }
}

/// Validate a raw rules document before trusting it: `apps` must be an
/// array, every app needs a `rules` array, every rule needs a trigger and
/// a non-empty list of string responses.
pub fn check_rules(settings: &Value) -> Result<(), RulesError> {
    if !settings.is_object() {
        return Err(RulesError::NotAnObject);
    }
    let Some(apps) = settings.get("apps").and_then(Value::as_array) else {
        return Err(RulesError::AppsNotArray);
    };
    for (app_index, app) in apps.iter().enumerate() {
        let Some(rules) = app.get("rules").and_then(Value::as_array) else {
            return Err(RulesError::RulesNotArray {
                app: app_label(app, app_index),
            });
        };
        for (rule_index, rule) in rules.iter().enumerate() {
            let has_exact = rule.get("messageExactMatch").is_some_and(Value::is_string);
            let has_pattern = rule.get("messagePattern").is_some_and(Value::is_string);
            if !has_exact && !has_pattern {
                return Err(RulesError::MissingTrigger {
                    app: app_label(app, app_index),
                    rule: rule_index + 1,
                });
            }
            let responses_ok = rule
                .get("responses")
                .and_then(Value::as_array)
                .is_some_and(|r| !r.is_empty() && r.iter().all(Value::is_string));
            if !responses_ok {
                return Err(RulesError::BadResponses {
                    app: app_label(app, app_index),
                    rule: rule_index + 1,
                });
            }
        }
    }
    Ok(())
}

fn app_label(app: &Value, index: usize) -> String {
    app.get("name")
        .and_then(Value::as_str)
        .map_or_else(|| format!("#{}", index + 1), str::to_string)
}

/// Default endpoints and field locations for a known app. Kept out of the
/// stored document so that updates here reach old saved copies.
#[derive(Debug, Clone, Copy)]
pub struct AppDefaults {
    pub url_pattern: &'static str,
    pub reply_url: &'static str,
    pub events_path: &'static str,
    pub event_from_url_path: &'static str,
    pub event_compose_time_path: &'static str,
    pub event_display_name_path: &'static str,
    pub event_to_id_path: &'static str,
    pub event_message_text_path: &'static str,
}

const TEAMS_DEFAULTS: AppDefaults = AppDefaults {
    url_pattern: r"https://[a-z0-9.\-]+\.teams\.(microsoft|live)\.com/.*/poll",
    reply_url: "https://teams.microsoft.com/api/chatsvc/consumer/v1/users/ME/conversations/{{toId}}/messages",
    events_path: "$.eventMessages[*]",
    event_from_url_path: "$.resource.from",
    event_compose_time_path: "$.resource.composetime",
    event_display_name_path: "$.resource.imdisplayname",
    event_to_id_path: "$.resource.to",
    event_message_text_path: "$.resource.content",
};

/// Look up the built-in defaults for an app name.
pub fn app_defaults(name: &str) -> Option<&'static AppDefaults> {
    match name {
        "teams" => Some(&TEAMS_DEFAULTS),
        _ => None,
    }
}

/// Fill every field covered by the app's default mapping that the user
/// left unset. Pure: the stored copy stays as authored.
#[must_use]
pub fn apply_defaults(mut settings: RulesSettings) -> RulesSettings {
    for app in &mut settings.apps {
        let Some(defaults) = app_defaults(&app.name) else {
            continue;
        };
        fill(&mut app.url_pattern, defaults.url_pattern);
        fill(&mut app.reply_url, defaults.reply_url);
        fill(&mut app.events_path, defaults.events_path);
        fill(&mut app.event_from_url_path, defaults.event_from_url_path);
        fill(
            &mut app.event_compose_time_path,
            defaults.event_compose_time_path,
        );
        fill(
            &mut app.event_display_name_path,
            defaults.event_display_name_path,
        );
        fill(&mut app.event_to_id_path, defaults.event_to_id_path);
        fill(
            &mut app.event_message_text_path,
            defaults.event_message_text_path,
        );
    }
    settings
}

fn fill(slot: &mut Option<String>, value: &str) {
    if slot.is_none() {
        *slot = Some(value.to_string());
    }
}

/// Built-in starter configuration: greet back on hello-style messages.
pub fn default_rules() -> RulesSettings {
    RulesSettings {
        date_modified: None,
        apps: vec![AppRules {
            name: "teams".into(),
            comments: Some("Reply to greetings while away.".into()),
            rules: vec![
                Rule {
                    message_pattern: Some(r"^\s*(hi|hello|hey)\b".into()),
                    regex_flags: Some("i".into()),
                    responses: vec![
                        "Hey {{ FROM_FIRST_NAME }}".into(),
                        "Hi {{ FROM_FIRST_NAME }}!".into(),
                    ],
                    ..Rule::default()
                },
                Rule {
                    message_exact_match: Some("Good morning".into()),
                    responses: vec!["Good morning {{ FROM_FIRST_NAME }}".into()],
                    ..Rule::default()
                },
            ],
            ..AppRules::default()
        }],
    }
}
