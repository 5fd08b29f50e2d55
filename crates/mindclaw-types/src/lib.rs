//! `mindclaw-types` – The Wire Contract
//!
//! Shared data types for the mindclaw skill: the voice platform's request and
//! response envelopes, the gadget control directive, and the attribute
//! records the skill reads and writes.
//!
//! # Modules
//!
//! - [`envelope`] – inbound [`RequestEnvelope`] and outbound
//!   [`ResponseEnvelope`] plus a [`ResponseBuilder`].
//! - [`directive`] – the [`Directive`] sent to the EV3 claw and the
//!   [`ClawCommand`] table mapping intents to command keywords.
//! - [`attributes`] – session-scoped [`SessionAttributes`] (endpoint cache)
//!   and per-user [`PersistentAttributes`].

pub mod attributes;
pub mod directive;
pub mod envelope;

pub use attributes::{
    DEFAULT_ROBOT_STATE, ENDPOINT_ID_KEY, EmptyEndpointId, EndpointId, PersistentAttributes,
    RobotAttributes, SessionAttributes,
};
pub use directive::{
    CONTROL_NAME, ClawCommand, ControlPayload, Directive, DirectiveEndpoint, DirectiveHeader,
    GADGET_NAMESPACE, SEND_DIRECTIVE_TYPE,
};
pub use envelope::{
    Application, Context, Intent, OutputSpeech, Reprompt, Request, RequestEnvelope, RequestType,
    Response, ResponseBuilder, ResponseEnvelope, Session, Slot, SystemContext, User,
};

use thiserror::Error;

/// Errors raised while handling a single skill request.
///
/// None of these ever reach the voice platform as a raw fault: the skill's
/// error handler converts each one into a spoken apology.
#[derive(Error, Debug)]
pub enum SkillError {
    #[error("Endpoint discovery failed: {0}")]
    Discovery(String),

    #[error("Attribute store failure: {0}")]
    Store(String),

    #[error("Persistent attributes are malformed: {0}")]
    MalformedAttributes(String),

    #[error("No handler can process request of type {request_type}")]
    NoHandler { request_type: String },

    #[error("Skill id mismatch: expected {expected}, got {actual}")]
    SkillIdMismatch { expected: String, actual: String },

    #[error("Handler {handler} panicked: {message}")]
    HandlerPanicked { handler: String, message: String },
}
