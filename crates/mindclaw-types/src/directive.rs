//! The gadget control [`Directive`] and the [`ClawCommand`] table.
//!
//! Every claw intent maps to exactly one command keyword and one slot name.
//! Keeping that mapping in a single enum means an intent can never be wired
//! to the wrong keyword or read the wrong slot.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::attributes::EndpointId;

/// Custom interface namespace the EV3 gadget subscribes to.
pub const GADGET_NAMESPACE: &str = "Custom.Mindstorms.Gadget";

/// Directive name handled by the gadget's control callback.
pub const CONTROL_NAME: &str = "control";

/// Platform directive type for sending a custom-interface message.
pub const SEND_DIRECTIVE_TYPE: &str = "CustomInterfaceController.SendDirective";

// ─────────────────────────────────────────────────────────────────────────────
// ClawCommand
// ─────────────────────────────────────────────────────────────────────────────

/// One claw movement the skill can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClawCommand {
    Open,
    Close,
    Up,
    Down,
    Dance,
}

impl ClawCommand {
    pub const ALL: [ClawCommand; 5] = [
        ClawCommand::Open,
        ClawCommand::Close,
        ClawCommand::Up,
        ClawCommand::Down,
        ClawCommand::Dance,
    ];

    /// Look up the command for an intent name such as `"ClawOpen"`.
    pub fn from_intent_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.intent_name() == name)
    }

    /// Intent name declared in the interaction model.
    pub fn intent_name(self) -> &'static str {
        match self {
            ClawCommand::Open => "ClawOpen",
            ClawCommand::Close => "ClawClose",
            ClawCommand::Up => "ClawUp",
            ClawCommand::Down => "ClawDown",
            ClawCommand::Dance => "ClawDance",
        }
    }

    /// Keyword placed in the directive payload's `type` field.
    pub fn keyword(self) -> &'static str {
        match self {
            ClawCommand::Open => "open",
            ClawCommand::Close => "close",
            ClawCommand::Up => "up",
            ClawCommand::Down => "down",
            ClawCommand::Dance => "dance",
        }
    }

    /// Slot carrying the location/target value for this intent.
    pub fn slot_name(self) -> &'static str {
        // The interaction model names each intent's slot after the intent.
        self.intent_name()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Directive
// ─────────────────────────────────────────────────────────────────────────────

/// Payload delivered to the gadget's `control` handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ControlPayload {
    /// Command keyword (`open`, `close`, `up`, `down`, `dance`).
    #[serde(rename = "type")]
    pub command: ClawCommand,
    /// Persisted robot state, forwarded unmodified.
    pub state: String,
    /// Slot value from the current request; `null` when the user gave none.
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveHeader {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveEndpoint {
    pub endpoint_id: EndpointId,
}

/// Outbound instruction for one connected gadget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    #[serde(rename = "type")]
    pub kind: String,
    pub header: DirectiveHeader,
    pub endpoint: DirectiveEndpoint,
    pub payload: ControlPayload,
}

impl Directive {
    /// Build a `Custom.Mindstorms.Gadget` / `control` directive for `endpoint`.
    pub fn control(endpoint: EndpointId, payload: ControlPayload) -> Self {
        Self {
            kind: SEND_DIRECTIVE_TYPE.to_string(),
            header: DirectiveHeader {
                namespace: GADGET_NAMESPACE.to_string(),
                name: CONTROL_NAME.to_string(),
            },
            endpoint: DirectiveEndpoint {
                endpoint_id: endpoint,
            },
            payload,
        }
    }

    pub fn endpoint_id(&self) -> &EndpointId {
        &self.endpoint.endpoint_id
    }
}
