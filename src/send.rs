//! Outbound reply dispatch.
//!
//! The engine hands matched replies to a [`MessageSink`]; the HTTP sink
//! POSTs them to the app's reply endpoint. Captured request headers are
//! forwarded opaquely since the exact set (authentication, client
//! version, session id, ...) is environment-specific.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::Rng;
use serde_json::{Value, json};

use crate::error::ExitError;
use crate::response::Response;
use crate::rules::AppRules;

/// Request headers captured from the intercepted poll.
pub type Headers = BTreeMap<String, String>;

/// Delivery seam for matched replies. Called at most once per matched
/// event; a failed send is the caller's to log, never to retry.
pub trait MessageSink {
    fn send(
        &self,
        display_name: &str,
        response: &Response,
        to_id: &str,
        headers: &Headers,
        app: &AppRules,
    ) -> anyhow::Result<()>;
}

/// Sink that drops replies; used for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn send(
        &self,
        _display_name: &str,
        _response: &Response,
        _to_id: &str,
        _headers: &Headers,
        _app: &AppRules,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Substitute the conversation id into a reply URL template.
pub fn reply_url(template: &str, to_id: &str) -> String {
    template.replace("{{toId}}", to_id)
}

/// Build the reply body the chat backend expects.
pub fn reply_body(response: &Response, client_message_id: &str) -> Value {
    json!({
        "content": response.text,
        "messagetype": response.message_type,
        "contenttype": "text",
        "amsreferences": [],
        "clientmessageid": client_message_id,
        "properties": {
            "importance": "",
            "subject": null,
        },
    })
}

/// Epoch millis plus a random suffix; unique enough for the backend to
/// dedup client sends.
fn client_message_id(now_millis: i64) -> String {
    let suffix: u32 = rand::rng().random_range(0..10_000);
    format!("{now_millis}{suffix}")
}

/// Sink that POSTs the reply to the app's `replyUrl`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSink;

impl MessageSink for HttpSink {
    fn send(
        &self,
        display_name: &str,
        response: &Response,
        to_id: &str,
        headers: &Headers,
        app: &AppRules,
    ) -> anyhow::Result<()> {
        let Some(template) = app.reply_url.as_deref() else {
            return Err(ExitError::Config(format!("app {}: no replyUrl configured", app.name)).into());
        };
        let url = reply_url(template, to_id);
        tracing::debug!(reply = %response.text, to = %display_name, "sending reply");

        let body = reply_body(response, &client_message_id(Utc::now().timestamp_millis()));
        let mut request = ureq::post(&url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        request
            .header("accept", "json")
            .header("content-type", "application/json")
            .send_json(&body)
            .map_err(|e| ExitError::Send(e.to_string()))?;
        Ok(())
    }
}
