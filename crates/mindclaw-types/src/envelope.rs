//! Request and response envelopes of the voice platform's JSON contract.
//!
//! Only the fields the skill consumes are modelled. Unknown fields are
//! ignored on input; absent optional fields are omitted on output.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attributes::SessionAttributes;
use crate::directive::Directive;

const ENVELOPE_VERSION: &str = "1.0";

fn default_version() -> String {
    ENVELOPE_VERSION.to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Request side
// ─────────────────────────────────────────────────────────────────────────────

/// A single inbound request from the voice platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    pub context: Context,
    pub request: Request,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
    #[serde(default)]
    pub attributes: SessionAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    #[serde(rename = "System")]
    pub system: SystemContext,
}

/// The `context.System` block: caller identity and platform API credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Base address of the platform API, e.g. `https://api.amazonalexa.com`.
    #[serde(default)]
    pub api_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub application_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
}

/// Category of an inbound request (`request.type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestType {
    Launch,
    Intent,
    SessionEnded,
    /// Any request type the skill has no dedicated handling for.
    Other(String),
}

impl RequestType {
    pub fn as_str(&self) -> &str {
        match self {
            RequestType::Launch => "LaunchRequest",
            RequestType::Intent => "IntentRequest",
            RequestType::SessionEnded => "SessionEndedRequest",
            RequestType::Other(name) => name,
        }
    }
}

impl From<String> for RequestType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "LaunchRequest" => RequestType::Launch,
            "IntentRequest" => RequestType::Intent,
            "SessionEndedRequest" => RequestType::SessionEnded,
            _ => RequestType::Other(value),
        }
    }
}

impl From<RequestType> for String {
    fn from(value: RequestType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `request` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(rename = "type")]
    pub kind: RequestType,
    #[serde(default)]
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    /// Why a session ended (`SessionEndedRequest` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub name: String,
    #[serde(default)]
    pub slots: BTreeMap<String, Slot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl RequestEnvelope {
    pub fn request_type(&self) -> &RequestType {
        &self.request.kind
    }

    /// Intent name for `IntentRequest`s, `None` otherwise.
    pub fn intent_name(&self) -> Option<&str> {
        match self.request.kind {
            RequestType::Intent => self.request.intent.as_ref().map(|i| i.name.as_str()),
            _ => None,
        }
    }

    /// Value of the named slot in the current intent, if the user filled it.
    pub fn slot_value(&self, slot: &str) -> Option<&str> {
        self.request
            .intent
            .as_ref()?
            .slots
            .get(slot)?
            .value
            .as_deref()
    }

    /// Stable user identifier, preferring `context.System.user`.
    pub fn user_id(&self) -> Option<&str> {
        self.context
            .system
            .user
            .as_ref()
            .or_else(|| self.session.as_ref().and_then(|s| s.user.as_ref()))
            .map(|u| u.user_id.as_str())
    }

    /// Skill application id, preferring `context.System.application`.
    pub fn application_id(&self) -> Option<&str> {
        self.context
            .system
            .application
            .as_ref()
            .or_else(|| self.session.as_ref().and_then(|s| s.application.as_ref()))
            .map(|a| a.application_id.as_str())
    }

    /// Take the session attributes out of the envelope (empty when sessionless).
    pub fn take_session_attributes(&mut self) -> SessionAttributes {
        self.session
            .as_mut()
            .map(|s| std::mem::take(&mut s.attributes))
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response side
// ─────────────────────────────────────────────────────────────────────────────

/// Speech rendered by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputSpeech {
    #[serde(rename = "SSML")]
    Ssml { ssml: String },
    PlainText { text: String },
}

impl OutputSpeech {
    /// Escape `text` and wrap it in a `<speak>` element.
    pub fn ssml(text: &str) -> Self {
        OutputSpeech::Ssml {
            ssml: format!("<speak>{}</speak>", escape_ssml(text)),
        }
    }

    /// The spoken text without the surrounding `<speak>` element, unescaped.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            OutputSpeech::Ssml { ssml } => {
                let inner = ssml
                    .strip_prefix("<speak>")
                    .and_then(|s| s.strip_suffix("</speak>"))
                    .unwrap_or(ssml);
                unescape_ssml(inner)
            }
            OutputSpeech::PlainText { text } => Cow::Borrowed(text),
        }
    }
}

const SSML_ENTITIES: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&apos;"),
];

fn escape_ssml(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match SSML_ENTITIES.iter().find(|(raw, _)| *raw == c) {
            Some((_, entity)) => out.push_str(entity),
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn unescape_ssml(ssml: &str) -> Cow<'_, str> {
    if !ssml.contains('&') {
        return Cow::Borrowed(ssml);
    }
    let mut out = String::with_capacity(ssml.len());
    let mut rest = ssml;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match SSML_ENTITIES.iter().find(|(_, entity)| rest.starts_with(entity)) {
            Some((raw, entity)) => {
                out.push(*raw);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

/// The `response` block of a [`ResponseEnvelope`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_end_session: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Directive>,
}

impl Response {
    /// Spoken text of the response, if any.
    pub fn speech(&self) -> Option<Cow<'_, str>> {
        self.output_speech.as_ref().map(OutputSpeech::text)
    }
}

/// Outbound reply to the voice platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "SessionAttributes::is_empty")]
    pub session_attributes: SessionAttributes,
    pub response: Response,
}

impl ResponseEnvelope {
    pub fn new(response: Response, session_attributes: SessionAttributes) -> Self {
        Self {
            version: default_version(),
            session_attributes,
            response,
        }
    }
}

/// Builder for a [`Response`].
///
/// ```
/// use mindclaw_types::ResponseBuilder;
///
/// let response = ResponseBuilder::new()
///     .speak("Welcome")
///     .reprompt("Awaiting commands")
///     .build();
/// assert_eq!(response.speech().as_deref(), Some("Welcome"));
/// assert_eq!(response.should_end_session, Some(false));
/// ```
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speak(mut self, text: &str) -> Self {
        self.response.output_speech = Some(OutputSpeech::ssml(text));
        self
    }

    /// Set a reprompt; this also keeps the session open.
    pub fn reprompt(mut self, text: &str) -> Self {
        self.response.reprompt = Some(Reprompt {
            output_speech: OutputSpeech::ssml(text),
        });
        self.response.should_end_session = Some(false);
        self
    }

    pub fn with_should_end_session(mut self, end: bool) -> Self {
        self.response.should_end_session = Some(end);
        self
    }

    pub fn add_directive(mut self, directive: Directive) -> Self {
        self.response.directives.push(directive);
        self
    }

    pub fn build(self) -> Response {
        self.response
    }
}
