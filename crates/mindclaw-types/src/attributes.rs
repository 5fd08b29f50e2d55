//! Session-scoped and persistent attribute records.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Session attribute key under which the resolved gadget endpoint is cached.
pub const ENDPOINT_ID_KEY: &str = "endpointId";

/// Robot state used when a user has no persisted record yet.
pub const DEFAULT_ROBOT_STATE: &str = "closed";

// ─────────────────────────────────────────────────────────────────────────────
// EndpointId
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier of one connected gadget (an EV3 brick paired to an Echo).
///
/// Always non-empty: [`EndpointId::new`] and deserialization both refuse the
/// empty string, so holding an `EndpointId` is proof that a directive has a
/// destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EndpointId(String);

/// Rejection of an empty endpoint identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("endpoint id must not be empty")]
pub struct EmptyEndpointId;

impl EndpointId {
    /// Wrap `id`, returning `None` when it is empty.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EndpointId {
    type Error = EmptyEndpointId;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id).ok_or(EmptyEndpointId)
    }
}

impl From<EndpointId> for String {
    fn from(id: EndpointId) -> Self {
        id.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionAttributes
// ─────────────────────────────────────────────────────────────────────────────

/// Free-form JSON attributes that live for one conversational session.
///
/// The platform hands them back on every turn of the session, so they double
/// as the endpoint cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionAttributes(Map<String, Value>);

impl SessionAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached endpoint, if one is stored and non-empty.
    ///
    /// Anything other than a non-empty string under [`ENDPOINT_ID_KEY`]
    /// (missing key, `""`, `[]`, `null`) reads as "not cached".
    pub fn endpoint_id(&self) -> Option<EndpointId> {
        self.0
            .get(ENDPOINT_ID_KEY)
            .and_then(Value::as_str)
            .and_then(EndpointId::new)
    }

    /// Cache `endpoint` for the rest of the session.
    pub fn set_endpoint_id(&mut self, endpoint: &EndpointId) {
        self.0.insert(
            ENDPOINT_ID_KEY.to_string(),
            Value::String(endpoint.as_str().to_string()),
        );
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PersistentAttributes
// ─────────────────────────────────────────────────────────────────────────────

/// Per-user record kept in the attribute store.
///
/// Only `robot.state` is interpreted; any other fields written by operators
/// survive a read/write cycle untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentAttributes {
    pub robot: RobotAttributes,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `robot` section of [`PersistentAttributes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotAttributes {
    /// Semantic state of the claw, e.g. `"open"` or `"closed"`.
    pub state: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PersistentAttributes {
    /// A record carrying only `robot.state = state`.
    pub fn with_state(state: impl Into<String>) -> Self {
        Self {
            robot: RobotAttributes {
                state: state.into(),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    pub fn state(&self) -> &str {
        &self.robot.state
    }
}

impl Default for PersistentAttributes {
    fn default() -> Self {
        Self::with_state(DEFAULT_ROBOT_STATE)
    }
}
