//! Response matching: find the first rule that matches an incoming
//! message and build the reply text.

use std::sync::OnceLock;

use rand::seq::IndexedRandom;
use regex::{NoExpand, RegexBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::rules::Rule;

/// Outbound message kind, serialized the way the chat backend spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum MessageType {
    #[serde(rename = "Text")]
    Text,
    #[serde(rename = "RichText/Html")]
    RichTextHtml,
}

/// A reply produced by the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub text: String,
    pub message_type: MessageType,
}

impl Response {
    pub fn new(text: impl Into<String>, message_type: MessageType) -> Self {
        Self {
            text: text.into(),
            message_type,
        }
    }
}

fn re_from_first_name() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\{\{\s*FROM_FIRST_NAME\s*\}\}").unwrap())
}

fn re_from() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\{\{\s*FROM\s*\}\}").unwrap())
}

/// Substitute sender placeholders into a reply template.
///
/// `{{ FROM_FIRST_NAME }}` becomes the first whitespace-delimited token of
/// `from` (empty when `from` is empty) and `{{ FROM }}` becomes the full
/// sender name; both are whitespace-tolerant inside the braces and apply
/// to every occurrence. The two patterns are disjoint, so the order of
/// the substitutions does not matter.
pub fn replace_response_text(text: &str, from: &str) -> String {
    let first_name = from.split_whitespace().next().unwrap_or_default();
    let result = re_from_first_name().replace_all(text, NoExpand(first_name));
    re_from().replace_all(&result, NoExpand(from)).into_owned()
}

/// Find the first rule matching `message_text` and build a reply.
///
/// Rules are checked in declaration order and the first hit wins, so a
/// specific rule placed earlier shadows later, more general ones. Returns
/// `None` when nothing matches; that is a normal outcome, not an error.
pub fn get_response(from: &str, message_text: &str, rules: &[Rule]) -> Option<Response> {
    for rule in rules {
        if !rule_matches(rule, message_text) {
            continue;
        }
        let Some(template) = rule.responses.choose(&mut rand::rng()) else {
            tracing::warn!(?rule, "no responses set for matched rule");
            return None;
        };
        let text = replace_response_text(template, from);
        return Some(Response::new(text, MessageType::RichTextHtml));
    }
    None
}

fn rule_matches(rule: &Rule, message_text: &str) -> bool {
    if rule.message_exact_match.as_deref() == Some(message_text) {
        return true;
    }
    let Some(pattern) = rule.message_pattern.as_deref() else {
        return false;
    };
    match build_regex(pattern, rule.regex_flags.as_deref()) {
        Ok(re) => re.is_match(message_text),
        Err(err) => {
            tracing::warn!(pattern, %err, "skipping rule with invalid pattern");
            false
        }
    }
}

/// Compile a rule pattern with JS-style flags. `i`, `m`, `s`, and `x` map
/// onto builder options; `g` and `u` have no equivalent toggle here and
/// are ignored.
fn build_regex(pattern: &str, flags: Option<&str>) -> Result<regex::Regex, regex::Error> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.unwrap_or_default().chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            _ => {}
        }
    }
    builder.build()
}
