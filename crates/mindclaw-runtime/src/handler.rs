//! Handler plumbing: [`HandlerInput`] and the [`RequestHandler`],
//! [`RequestInterceptor`] and [`ErrorHandler`] traits.

use std::sync::Arc;

use async_trait::async_trait;
use mindclaw_store::AttributeStore;
use mindclaw_types::{
    EndpointId, PersistentAttributes, RequestEnvelope, RequestType, Response, SessionAttributes,
    SkillError,
};
use serde_json::Value;
use tracing::debug;

use crate::discovery::DiscoveryError;
use crate::resolver::EndpointResolver;

impl From<DiscoveryError> for SkillError {
    fn from(err: DiscoveryError) -> Self {
        SkillError::Discovery(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AttributesManager
// ─────────────────────────────────────────────────────────────────────────────

/// Read access to per-user persistent attributes with a fixed fallback.
#[derive(Clone)]
pub struct AttributesManager {
    store: Arc<dyn AttributeStore>,
    defaults: PersistentAttributes,
}

impl AttributesManager {
    pub fn new(store: Arc<dyn AttributeStore>, defaults: PersistentAttributes) -> Self {
        Self { store, defaults }
    }

    /// The record used when a user has nothing stored.
    pub fn defaults(&self) -> &PersistentAttributes {
        &self.defaults
    }

    /// Load the record for `user_id`.
    ///
    /// No user id, no stored record, a stored `null` or an empty stored
    /// object all yield a clone of the defaults.
    pub async fn load(&self, user_id: Option<&str>) -> Result<PersistentAttributes, SkillError> {
        let Some(user_id) = user_id else {
            debug!("request has no user id; using default attributes");
            return Ok(self.defaults.clone());
        };
        let record = self
            .store
            .get(user_id)
            .await
            .map_err(|e| SkillError::Store(e.to_string()))?;
        match record {
            None | Some(Value::Null) => Ok(self.defaults.clone()),
            Some(Value::Object(map)) if map.is_empty() => Ok(self.defaults.clone()),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| SkillError::MalformedAttributes(e.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HandlerInput
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a handler sees for one request.
///
/// Owns the session attributes for the duration of the dispatch; they are
/// handed back to the skill when the response is assembled.
pub struct HandlerInput<'a> {
    envelope: &'a RequestEnvelope,
    session: SessionAttributes,
    resolver: &'a EndpointResolver,
    attributes: &'a AttributesManager,
}

impl<'a> HandlerInput<'a> {
    pub fn new(
        envelope: &'a RequestEnvelope,
        session: SessionAttributes,
        resolver: &'a EndpointResolver,
        attributes: &'a AttributesManager,
    ) -> Self {
        Self {
            envelope,
            session,
            resolver,
            attributes,
        }
    }

    pub fn envelope(&self) -> &RequestEnvelope {
        self.envelope
    }

    pub fn request_type(&self) -> &RequestType {
        self.envelope.request_type()
    }

    pub fn intent_name(&self) -> Option<&str> {
        self.envelope.intent_name()
    }

    pub fn session(&self) -> &SessionAttributes {
        &self.session
    }

    /// Resolve the gadget endpoint, caching it in the session.
    pub async fn resolve_endpoint(&mut self) -> Result<Option<EndpointId>, SkillError> {
        Ok(self
            .resolver
            .resolve(&mut self.session, &self.envelope.context.system)
            .await?)
    }

    /// Load the caller's persistent attributes (or the defaults).
    pub async fn persistent_attributes(&self) -> Result<PersistentAttributes, SkillError> {
        self.attributes.load(self.envelope.user_id()).await
    }

    pub(crate) fn into_session(self) -> SessionAttributes {
        self.session
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────────────────────────────────────

/// One entry in the dispatch table.
///
/// The skill calls [`can_handle`](RequestHandler::can_handle) on each
/// registered handler in order and runs the first that accepts.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    fn can_handle(&self, input: &HandlerInput<'_>) -> bool;

    async fn handle(&self, input: &mut HandlerInput<'_>) -> Result<Response, SkillError>;
}

/// Runs before handler selection on every request.
pub trait RequestInterceptor: Send + Sync {
    fn process(&self, input: &HandlerInput<'_>);
}

/// Turns a failed dispatch into a user-facing response.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, input: &HandlerInput<'_>, error: &SkillError) -> Response;
}
