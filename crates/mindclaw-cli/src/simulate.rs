//! Synthetic request envelopes for local dry runs.

use std::collections::BTreeMap;

use mindclaw_types::{
    Application, ClawCommand, Context, EndpointId, Intent, Request, RequestEnvelope, RequestType,
    Session, SessionAttributes, Slot, SystemContext, User,
};

/// Platform API base used when none is given.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.amazonalexa.com";

/// Parameters of one simulated utterance.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// An intent name, or `LaunchRequest`.
    pub intent: String,
    pub location: Option<String>,
    pub user_id: String,
    /// Pre-cached gadget endpoint; skips discovery when set.
    pub endpoint: Option<String>,
    pub api_endpoint: String,
    pub access_token: Option<String>,
    pub skill_id: Option<String>,
}

/// Build the envelope the platform would send for `utterance`.
pub fn envelope(utterance: &Utterance) -> RequestEnvelope {
    let user = User {
        user_id: utterance.user_id.clone(),
    };
    let application = utterance.skill_id.as_ref().map(|id| Application {
        application_id: id.clone(),
    });

    let mut attributes = SessionAttributes::new();
    if let Some(endpoint) = utterance.endpoint.as_deref().and_then(EndpointId::new) {
        attributes.set_endpoint_id(&endpoint);
    }

    let (kind, intent) = if utterance.intent == RequestType::Launch.as_str() {
        (RequestType::Launch, None)
    } else {
        (RequestType::Intent, Some(intent(utterance)))
    };

    RequestEnvelope {
        version: "1.0".to_string(),
        session: Some(Session {
            new: attributes.is_empty(),
            session_id: format!("mindclaw.session.{}", uuid::Uuid::new_v4()),
            application: application.clone(),
            attributes,
            user: Some(user.clone()),
        }),
        context: Context {
            system: SystemContext {
                application,
                user: Some(user),
                api_endpoint: utterance.api_endpoint.clone(),
                api_access_token: utterance.access_token.clone(),
            },
        },
        request: Request {
            kind,
            request_id: format!("mindclaw.request.{}", uuid::Uuid::new_v4()),
            timestamp: Some(chrono::Utc::now()),
            locale: Some("en-US".to_string()),
            intent,
            reason: None,
        },
    }
}

// Claw intents carry their location in a slot named after the intent.
fn intent(utterance: &Utterance) -> Intent {
    let mut slots = BTreeMap::new();
    if let Some(command) = ClawCommand::from_intent_name(&utterance.intent) {
        let name = command.slot_name().to_string();
        slots.insert(
            name.clone(),
            Slot {
                name,
                value: utterance.location.clone(),
            },
        );
    }
    Intent {
        name: utterance.intent.clone(),
        slots,
    }
}
