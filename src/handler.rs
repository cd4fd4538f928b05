//! Event extraction and handling: pull message events out of a polled
//! response body, filter self-sent and stale messages, match the rest
//! against the app's rules, and dispatch replies.

use std::borrow::Cow;
use std::sync::OnceLock;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::path::FieldPath;
use crate::response::{self, Response};
use crate::rules::{AppRules, Rule, RulesSettings};
use crate::send::{Headers, MessageSink};

/// Maximum message age in seconds before the staleness filter drops it.
/// Bounds how far the inbox state may lag behind real-time polling and
/// keeps old history from being replayed on first load.
pub const MAX_MESSAGE_AGE_SECS: i64 = 60;

/// Minimum byte offset at which the sender id must appear in the request
/// URL for the message to count as the current user's own. Guards against
/// matching inside the scheme or an early path segment; a heuristic, not
/// a strict contract.
pub const MIN_URL_ID_OFFSET: usize = 10;

/// Events are read from here when the app configures no `eventsPath`.
const FIXED_EVENTS_PATH: &str = "$.eventMessages[*]";

const DEFAULT_FROM_URL_PATH: &str = "$.resource.from";
const DEFAULT_COMPOSE_TIME_PATH: &str = "$.resource.composetime";
const DEFAULT_DISPLAY_NAME_PATH: &str = "$.resource.imdisplayname";
const DEFAULT_TO_ID_PATH: &str = "$.resource.to";
const DEFAULT_MESSAGE_TEXT_PATH: &str = "$.resource.content";

/// One observed message event and the reply (if any) it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub from: String,
    pub message_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,
}

/// Everything the handler observed in one response body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HandleResult {
    pub matches: Vec<MatchRecord>,
}

/// Strategy seam for the rule matcher, so a host can swap in its own
/// matching logic while keeping the extraction pipeline.
pub trait Matcher {
    fn get_response(&self, from: &str, message_text: &str, rules: &[Rule]) -> Option<Response>;
}

/// Built-in matcher backed by [`response::get_response`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleMatcher;

impl Matcher for RuleMatcher {
    fn get_response(&self, from: &str, message_text: &str, rules: &[Rule]) -> Option<Response> {
        response::get_response(from, message_text, rules)
    }
}

/// Strategy seam for the whole handler, for hosts that replace event
/// extraction entirely rather than just the matcher.
pub trait ResponseHandler {
    fn handle_response(
        &self,
        url: &str,
        body: &Value,
        headers: &Headers,
        app: &AppRules,
    ) -> HandleResult;
}

/// Run every app whose `urlPattern` matches the response URL through the
/// handler, concatenating the match records.
pub fn handle_all(
    handler: &dyn ResponseHandler,
    url: &str,
    body: &Value,
    headers: &Headers,
    settings: &RulesSettings,
) -> HandleResult {
    let mut result = HandleResult::default();
    for app in &settings.apps {
        if !app.matches_url(url) {
            continue;
        }
        result
            .matches
            .extend(handler.handle_response(url, body, headers, app).matches);
    }
    result
}

/// The built-in extraction engine, parameterized over the matcher and the
/// delivery sink.
pub struct Engine<'a> {
    matcher: &'a dyn Matcher,
    sink: &'a dyn MessageSink,
}

impl<'a> Engine<'a> {
    pub fn new(matcher: &'a dyn Matcher, sink: &'a dyn MessageSink) -> Self {
        Self { matcher, sink }
    }

    /// Like the trait method, with an explicit notion of "now" for the
    /// staleness filter.
    pub fn handle_response_at(
        &self,
        url: &str,
        body: &Value,
        headers: &Headers,
        app: &AppRules,
        now: DateTime<Utc>,
    ) -> HandleResult {
        let mut result = HandleResult::default();
        for event in collect_events(body, app) {
            // One bad event must not take down the rest of the batch.
            if let Some(record) = self.handle_event(url, event, headers, app, now) {
                result.matches.push(record);
            }
        }
        result
    }

    fn handle_event(
        &self,
        url: &str,
        event: &Value,
        headers: &Headers,
        app: &AppRules,
        now: DateTime<Utc>,
    ) -> Option<MatchRecord> {
        let event = effective_event(event);
        let event = &*event;

        if let Some(from_url) =
            field(event, app.event_from_url_path.as_deref(), DEFAULT_FROM_URL_PATH)
                .and_then(Value::as_str)
            && is_from_current_user(from_url, url)
        {
            return None;
        }

        if let Some(compose_time) = field(
            event,
            app.event_compose_time_path.as_deref(),
            DEFAULT_COMPOSE_TIME_PATH,
        )
        .and_then(Value::as_str)
            && is_stale(compose_time, now)
        {
            return None;
        }

        let from = field(
            event,
            app.event_display_name_path.as_deref(),
            DEFAULT_DISPLAY_NAME_PATH,
        )
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
        let to_id = field(event, app.event_to_id_path.as_deref(), DEFAULT_TO_ID_PATH)
            .and_then(Value::as_str)
            .map(str::to_string);

        let message_text = message_text(event, app)?;
        if message_text.is_empty() {
            return None;
        }
        tracing::debug!(%message_text, %from, "got message");

        let response = self.matcher.get_response(&from, &message_text, &app.rules);
        if let Some(ref response) = response {
            // Exactly one send per matched event; a failed send is logged
            // and must not abort the rest of the batch.
            let to = to_id.as_deref().unwrap_or_default();
            if let Err(err) = self.sink.send(&from, response, to, headers, app) {
                tracing::error!(%err, %from, "failed to send reply");
            }
        }

        Some(MatchRecord {
            from,
            message_text,
            to_id,
            response,
        })
    }
}

impl ResponseHandler for Engine<'_> {
    fn handle_response(
        &self,
        url: &str,
        body: &Value,
        headers: &Headers,
        app: &AppRules,
    ) -> HandleResult {
        self.handle_response_at(url, body, headers, app, Utc::now())
    }
}

/// Candidate events for one response body. With a configured `eventsPath`
/// the app decides; without one, the fixed Teams-style shape applies,
/// including its gate on event and resource types.
fn collect_events<'v>(body: &'v Value, app: &AppRules) -> Vec<&'v Value> {
    match app.events_path.as_deref() {
        Some(configured) => match FieldPath::parse(configured) {
            Ok(path) => path.query(body),
            Err(err) => {
                tracing::warn!(app = %app.name, %err, "invalid eventsPath");
                Vec::new()
            }
        },
        None => match FieldPath::parse(FIXED_EVENTS_PATH) {
            Ok(path) => path
                .query(body)
                .into_iter()
                .filter(|event| is_new_message(event))
                .collect(),
            Err(_) => Vec::new(),
        },
    }
}

fn is_new_message(event: &Value) -> bool {
    event.get("type").and_then(Value::as_str) == Some("EventMessage")
        && event.get("resourceType").and_then(Value::as_str) == Some("NewMessage")
        && event.get("resource").is_some()
}

/// Events sometimes wrap the live message under `resource.lastMessage`;
/// unwrap it so field locations resolve against the actual message.
fn effective_event(event: &Value) -> Cow<'_, Value> {
    let Some(last) = event.pointer("/resource/lastMessage") else {
        return Cow::Borrowed(event);
    };
    let mut owned = event.clone();
    if let Some(map) = owned.as_object_mut() {
        map.insert("resource".into(), last.clone());
    }
    Cow::Owned(owned)
}

/// Resolve one field location against an event, preferring the app's
/// configured path over the built-in default. An unresolvable or invalid
/// location yields nothing; missing fields are normal, not errors.
fn field<'v>(event: &'v Value, configured: Option<&str>, default_path: &str) -> Option<&'v Value> {
    let location = configured.unwrap_or(default_path);
    match FieldPath::parse(location) {
        Ok(path) => path.value(event),
        Err(err) => {
            tracing::warn!(%location, %err, "invalid field location");
            None
        }
    }
}

/// Extract the message text, filtering on content type. Only plain text
/// and HTML-in-text messages qualify; anything else (typing indicators,
/// control traffic) yields nothing.
fn message_text(event: &Value, app: &AppRules) -> Option<String> {
    let resource = event.get("resource")?;
    let message_type = resource.get("messagetype").and_then(Value::as_str)?;
    let content_type = resource.get("contenttype").and_then(Value::as_str)?;
    if content_type != "text" {
        return None;
    }
    let raw = field(
        event,
        app.event_message_text_path.as_deref(),
        DEFAULT_MESSAGE_TEXT_PATH,
    )
    .and_then(Value::as_str)?;
    match message_type {
        "Text" => Some(raw.to_string()),
        "RichText/Html" => Some(strip_html(raw)),
        // Other kinds seen in the wild: "Control/Typing", "Application/Message".
        _ => None,
    }
}

fn re_html_tag() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"<[^>]+>").unwrap())
}

/// Tag removal, not an HTML parser; good enough for the chat bodies this
/// sees and free of anything that could render content.
fn strip_html(text: &str) -> String {
    re_html_tag().replace_all(text, "").into_owned()
}

fn re_trailing_id() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"[A-Za-z0-9-]+$").unwrap())
}

/// Returns `true` if the message came from the current user.
///
/// `from` is a contact URL ending in the sender's identifier (typically a
/// UUID) and the polling URL embeds the current user's own identifier, so
/// a sender id that appears in the URL past [`MIN_URL_ID_OFFSET`] marks
/// the event as an echo of the user's own message.
pub fn is_from_current_user(from: &str, request_url: &str) -> bool {
    is_from_current_user_at(from, request_url, MIN_URL_ID_OFFSET)
}

/// [`is_from_current_user`] with an explicit offset threshold.
pub fn is_from_current_user_at(from: &str, request_url: &str, min_offset: usize) -> bool {
    let Some(id) = re_trailing_id().find(from) else {
        tracing::warn!("couldn't get the current user's id");
        return false;
    };
    request_url
        .find(id.as_str())
        .is_some_and(|at| at > min_offset)
}

fn is_stale(compose_time: &str, now: DateTime<Utc>) -> bool {
    let Ok(sent) = DateTime::parse_from_rfc3339(compose_time) else {
        tracing::warn!(compose_time, "unparseable compose time");
        return false;
    };
    now.signed_duration_since(sent) > TimeDelta::seconds(MAX_MESSAGE_AGE_SECS)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;
    use crate::response::MessageType;

    /// Records every send so tests can assert on dispatch behavior.
    #[derive(Default)]
    struct CollectSink {
        sent: RefCell<Vec<(String, Response, String)>>,
    }

    impl MessageSink for CollectSink {
        fn send(
            &self,
            display_name: &str,
            response: &Response,
            to_id: &str,
            _headers: &Headers,
            _app: &AppRules,
        ) -> anyhow::Result<()> {
            self.sent.borrow_mut().push((
                display_name.to_string(),
                response.clone(),
                to_id.to_string(),
            ));
            Ok(())
        }
    }

    /// Sink that always fails, for the isolation tests.
    struct FailingSink;

    impl MessageSink for FailingSink {
        fn send(
            &self,
            _display_name: &str,
            _response: &Response,
            _to_id: &str,
            _headers: &Headers,
            _app: &AppRules,
        ) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    const POLL_URL: &str =
        "https://eastus2.notifications.teams.example.com/users/8:orgid:11111111-aaaa-bbbb-cccc-222222222222/endpoints/abc/events/poll";

    fn now() -> DateTime<Utc> {
        "2026-08-01T12:00:00Z".parse().unwrap()
    }

    fn teams_app(rules: Vec<Rule>) -> AppRules {
        AppRules {
            name: "teams".into(),
            url_pattern: Some("/events/poll".into()),
            reply_url: Some("https://example.test/{{toId}}/messages".into()),
            rules,
            ..AppRules::default()
        }
    }

    fn hi_rule() -> Rule {
        Rule {
            message_exact_match: Some("Hi".into()),
            responses: vec!["Hey".into()],
            ..Rule::default()
        }
    }

    fn event(resource: Value) -> Value {
        json!({
            "type": "EventMessage",
            "resourceType": "NewMessage",
            "resource": resource,
        })
    }

    fn text_resource(content: &str) -> Value {
        json!({
            "from": "https://notifications.example.net/v1/users/ME/contacts/8:orgid:99999999-dddd-eeee-ffff-000000000000",
            "composetime": "2026-08-01T11:59:30Z",
            "imdisplayname": "First Last",
            "to": "19:thread",
            "messagetype": "Text",
            "contenttype": "text",
            "content": content,
        })
    }

    fn run(app: &AppRules, body: &Value, sink: &dyn MessageSink) -> HandleResult {
        let matcher = RuleMatcher;
        let engine = Engine::new(&matcher, sink);
        engine.handle_response_at(POLL_URL, body, &Headers::new(), app, now())
    }

    #[test]
    fn text_event_matches_and_sends_once() {
        let app = teams_app(vec![hi_rule()]);
        let body = json!({"eventMessages": [event(text_resource("Hi"))]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert_eq!(result.matches.len(), 1);
        let record = &result.matches[0];
        assert_eq!(record.from, "First Last");
        assert_eq!(record.message_text, "Hi");
        assert_eq!(record.to_id.as_deref(), Some("19:thread"));
        assert_eq!(record.response.as_ref().unwrap().text, "Hey");

        let sent = sink.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "First Last");
        assert_eq!(sent[0].1.text, "Hey");
        assert_eq!(sent[0].2, "19:thread");
    }

    #[test]
    fn placeholders_use_the_sender_name() {
        let app = teams_app(vec![Rule {
            message_exact_match: Some("Hi".into()),
            responses: vec!["Hey {{ FROM }}".into()],
            ..Rule::default()
        }]);
        let body = json!({"eventMessages": [event(text_resource("Hi"))]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert_eq!(result.matches[0].response.as_ref().unwrap().text, "Hey First Last");
    }

    #[test]
    fn last_message_wrapper_is_unwrapped() {
        let app = teams_app(vec![hi_rule()]);
        let body = json!({"eventMessages": [event(json!({"lastMessage": text_resource("Hi")}))]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].message_text, "Hi");
        assert_eq!(sink.sent.borrow().len(), 1);
    }

    #[test]
    fn self_messages_are_skipped() {
        let app = teams_app(vec![hi_rule()]);
        let mut resource = text_resource("Hi");
        resource["from"] = json!(
            "https://notifications.example.net/v1/users/ME/contacts/8:orgid:11111111-aaaa-bbbb-cccc-222222222222"
        );
        let body = json!({"eventMessages": [event(resource)]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert!(result.matches.is_empty());
        assert!(sink.sent.borrow().is_empty());
    }

    #[test]
    fn stale_messages_are_skipped() {
        let app = teams_app(vec![hi_rule()]);
        let mut resource = text_resource("Hi");
        resource["composetime"] = json!("2026-08-01T11:58:59Z");
        let body = json!({"eventMessages": [event(resource)]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert!(result.matches.is_empty());
        assert!(sink.sent.borrow().is_empty());
    }

    #[test]
    fn messages_right_at_the_age_limit_pass() {
        let app = teams_app(vec![hi_rule()]);
        let mut resource = text_resource("Hi");
        resource["composetime"] = json!("2026-08-01T11:59:00Z");
        let body = json!({"eventMessages": [event(resource)]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert_eq!(result.matches.len(), 1);
    }

    #[test]
    fn missing_compose_time_is_not_stale() {
        let app = teams_app(vec![hi_rule()]);
        let mut resource = text_resource("Hi");
        resource.as_object_mut().unwrap().remove("composetime");
        let body = json!({"eventMessages": [event(resource)]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert_eq!(result.matches.len(), 1);
    }

    #[test]
    fn non_event_message_types_are_ignored() {
        let app = teams_app(vec![hi_rule()]);
        let body = json!({"eventMessages": [{
            "type": "EventUpdate",
            "resourceType": "NewMessage",
            "resource": text_resource("Hi"),
        }]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert!(result.matches.is_empty());
        assert!(sink.sent.borrow().is_empty());
    }

    #[test]
    fn typing_indicators_yield_no_match() {
        let app = teams_app(vec![hi_rule()]);
        let mut resource = text_resource("Hi");
        resource["messagetype"] = json!("Control/Typing");
        resource["contenttype"] = json!("Application/Message");
        let body = json!({"eventMessages": [event(resource)]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert!(result.matches.is_empty());
    }

    #[test]
    fn rich_text_html_is_stripped() {
        let app = teams_app(vec![hi_rule()]);
        let mut resource = text_resource("<p>Hi</p>");
        resource["messagetype"] = json!("RichText/Html");
        let body = json!({"eventMessages": [event(resource)]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].message_text, "Hi");
        assert_eq!(sink.sent.borrow().len(), 1);
    }

    #[test]
    fn unmatched_messages_are_recorded_without_a_send() {
        let app = teams_app(vec![hi_rule()]);
        let body = json!({"eventMessages": [event(text_resource("completely different"))]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert_eq!(result.matches.len(), 1);
        assert!(result.matches[0].response.is_none());
        assert!(sink.sent.borrow().is_empty());
    }

    #[test]
    fn malformed_events_do_not_stop_the_batch() {
        let app = teams_app(vec![hi_rule()]);
        let body = json!({"eventMessages": [
            {"type": "EventMessage", "resourceType": "NewMessage", "resource": {"messagetype": 7}},
            event(json!({"unexpected": "shape"})),
            event(text_resource("Hi")),
        ]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].message_text, "Hi");
    }

    #[test]
    fn failed_sends_do_not_stop_the_batch() {
        let app = teams_app(vec![hi_rule()]);
        let body = json!({"eventMessages": [
            event(text_resource("Hi")),
            event(text_resource("Hi")),
        ]});

        let result = run(&app, &body, &FailingSink);

        assert_eq!(result.matches.len(), 2);
        assert!(result.matches.iter().all(|m| m.response.is_some()));
    }

    #[test]
    fn configured_paths_drive_extraction() {
        let app = AppRules {
            name: "chatworks".into(),
            url_pattern: Some("/inbox".into()),
            events_path: Some("$.inbox.items[*]".into()),
            event_from_url_path: Some("$.sender.link".into()),
            event_compose_time_path: Some("$.sentAt".into()),
            event_display_name_path: Some("$.sender.name".into()),
            event_to_id_path: Some("$.thread".into()),
            event_message_text_path: Some("$.resource.content".into()),
            rules: vec![hi_rule()],
            ..AppRules::default()
        };
        let body = json!({"inbox": {"items": [{
            "sender": {
                "link": "https://contacts.example.net/people/33333333-abcd-abcd-abcd-444444444444",
                "name": "Ann Lee",
            },
            "sentAt": "2026-08-01T11:59:45Z",
            "thread": "t-42",
            "resource": {
                "messagetype": "Text",
                "contenttype": "text",
                "content": "Hi",
            },
        }]}});
        let sink = CollectSink::default();
        let matcher = RuleMatcher;
        let engine = Engine::new(&matcher, &sink);

        let result = engine.handle_response_at(
            "https://chatworks.example.com/u/55555555-1111-2222-3333-666666666666/inbox",
            &body,
            &Headers::new(),
            &app,
            now(),
        );

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].from, "Ann Lee");
        assert_eq!(result.matches[0].to_id.as_deref(), Some("t-42"));
        assert_eq!(sink.sent.borrow().len(), 1);
    }

    #[test]
    fn configured_mode_skips_the_event_type_gate() {
        // With an eventsPath configured, events are whatever the path
        // says; the fixed-shape type gate does not apply.
        let app = AppRules {
            name: "teams".into(),
            events_path: Some("$.eventMessages[*]".into()),
            rules: vec![hi_rule()],
            ..AppRules::default()
        };
        let body = json!({"eventMessages": [{
            "type": "EventUpdate",
            "resource": text_resource("Hi"),
        }]});
        let sink = CollectSink::default();

        let result = run(&app, &body, &sink);

        assert_eq!(result.matches.len(), 1);
    }

    #[test]
    fn custom_matcher_overrides_the_rules() {
        struct Canned;
        impl Matcher for Canned {
            fn get_response(&self, _: &str, _: &str, _: &[Rule]) -> Option<Response> {
                Some(Response::new("canned", MessageType::Text))
            }
        }

        let app = teams_app(vec![]);
        let body = json!({"eventMessages": [event(text_resource("anything"))]});
        let sink = CollectSink::default();
        let matcher = Canned;
        let engine = Engine::new(&matcher, &sink);

        let result =
            engine.handle_response_at(POLL_URL, &body, &Headers::new(), &app, now());

        assert_eq!(result.matches[0].response.as_ref().unwrap().text, "canned");
        assert_eq!(sink.sent.borrow().len(), 1);
    }

    #[test]
    fn host_supplied_handlers_take_precedence() {
        struct Canned;
        impl ResponseHandler for Canned {
            fn handle_response(
                &self,
                _url: &str,
                _body: &Value,
                _headers: &Headers,
                _app: &AppRules,
            ) -> HandleResult {
                HandleResult {
                    matches: vec![MatchRecord {
                        from: "host".into(),
                        message_text: "override".into(),
                        to_id: None,
                        response: None,
                    }],
                }
            }
        }

        let settings = RulesSettings {
            date_modified: None,
            apps: vec![teams_app(vec![hi_rule()])],
        };
        let body = json!({"eventMessages": [event(text_resource("Hi"))]});

        let result = handle_all(&Canned, POLL_URL, &body, &Headers::new(), &settings);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].from, "host");
    }

    #[test]
    fn handle_all_selects_apps_by_url_pattern() {
        let settings = RulesSettings {
            date_modified: None,
            apps: vec![
                AppRules {
                    name: "other".into(),
                    url_pattern: Some("chatworks".into()),
                    rules: vec![hi_rule()],
                    ..AppRules::default()
                },
                teams_app(vec![hi_rule()]),
            ],
        };
        let body = json!({"eventMessages": [event(text_resource("Hi"))]});
        let sink = CollectSink::default();
        let matcher = RuleMatcher;
        let engine = Engine::new(&matcher, &sink);

        let result = handle_all(&engine, POLL_URL, &body, &Headers::new(), &settings);

        assert_eq!(result.matches.len(), 1);
        assert_eq!(sink.sent.borrow().len(), 1);
    }

    #[test]
    fn match_records_serialize_with_wire_names() {
        let record = MatchRecord {
            from: "Ann".into(),
            message_text: "Hi".into(),
            to_id: Some("19:x".into()),
            response: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["messageText"], "Hi");
        assert_eq!(value["toId"], "19:x");
        assert!(value.get("response").is_none());
    }

    // --- is_from_current_user ---

    #[test]
    fn detects_own_id_late_in_the_url() {
        let from = "https://notifications.example.net/v1/users/ME/contacts/8:orgid:11111111-aaaa-bbbb-cccc-222222222222";
        assert!(is_from_current_user(from, POLL_URL));
    }

    #[test]
    fn other_senders_are_not_the_current_user() {
        let from = "https://notifications.example.net/v1/users/ME/contacts/8:orgid:99999999-dddd-eeee-ffff-000000000000";
        assert!(!is_from_current_user(from, POLL_URL));
    }

    #[test]
    fn early_offset_matches_do_not_count() {
        // The id appears at offset 8, inside the host: below the threshold.
        assert!(!is_from_current_user_at("contacts/abc", "https://abc.example.com/poll", 10));
        // The same id past the threshold counts.
        assert!(is_from_current_user_at("contacts/abc", "https://example.com/users/abc", 10));
    }

    #[test]
    fn from_without_identifier_is_not_the_current_user() {
        assert!(!is_from_current_user("***", POLL_URL));
        assert!(!is_from_current_user("", POLL_URL));
    }

    // --- is_stale ---

    #[test]
    fn stale_is_relative_to_now() {
        assert!(is_stale("2026-08-01T11:58:00Z", now()));
        assert!(!is_stale("2026-08-01T11:59:30Z", now()));
        assert!(!is_stale("2026-08-01T12:05:00Z", now()));
    }

    #[test]
    fn unparseable_compose_time_is_not_stale() {
        assert!(!is_stale("yesterday-ish", now()));
    }

    // --- strip_html ---

    #[test]
    fn strip_html_removes_tags_only() {
        assert_eq!(strip_html("<p>Hi <b>there</b></p>"), "Hi there");
        assert_eq!(strip_html("no tags"), "no tags");
    }
}
