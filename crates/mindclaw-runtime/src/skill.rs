//! [`Skill`] – the request dispatcher.
//!
//! A skill is assembled once with [`SkillBuilder`] and then shared (it is
//! immutable) across every request. [`Skill::dispatch`] always produces a
//! response: handler errors, panics and unmatched requests all end up in the
//! registered [`ErrorHandler`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use mindclaw_store::AttributeStore;
use mindclaw_types::{PersistentAttributes, RequestEnvelope, ResponseEnvelope, SkillError};
use tracing::{debug, instrument, warn};

use crate::discovery::EndpointDiscovery;
use crate::handler::{
    AttributesManager, ErrorHandler, HandlerInput, RequestHandler, RequestInterceptor,
};
use crate::handlers::{self, ApologyErrorHandler, LoggingInterceptor};
use crate::resolver::EndpointResolver;

/// Construction-time settings of a [`Skill`].
#[derive(Debug, Clone, Default)]
pub struct SkillSettings {
    /// Record used for users with no persisted attributes.
    pub default_attributes: PersistentAttributes,
    /// When set, requests addressed to another skill are refused.
    pub skill_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// SkillBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`Skill`].
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use mindclaw_runtime::{HttpEndpointDiscovery, SkillBuilder, SkillSettings};
/// use mindclaw_store::MemoryAttributeStore;
///
/// let skill = SkillBuilder::new(
///     Arc::new(HttpEndpointDiscovery::new()),
///     Arc::new(MemoryAttributeStore::new()),
/// )
/// .with_settings(SkillSettings::default())
/// .with_standard_handlers()
/// .build();
/// ```
pub struct SkillBuilder {
    discovery: Arc<dyn EndpointDiscovery>,
    store: Arc<dyn AttributeStore>,
    settings: SkillSettings,
    handlers: Vec<Box<dyn RequestHandler>>,
    interceptors: Vec<Box<dyn RequestInterceptor>>,
    error_handler: Option<Box<dyn ErrorHandler>>,
}

impl SkillBuilder {
    pub fn new(discovery: Arc<dyn EndpointDiscovery>, store: Arc<dyn AttributeStore>) -> Self {
        Self {
            discovery,
            store,
            settings: SkillSettings::default(),
            handlers: Vec::new(),
            interceptors: Vec::new(),
            error_handler: None,
        }
    }

    pub fn with_settings(mut self, settings: SkillSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Append the launch, claw, built-in and reflector handlers plus the
    /// logging interceptor.
    pub fn with_standard_handlers(mut self) -> Self {
        self.handlers.extend(handlers::standard_handlers());
        self.interceptors.push(Box::new(LoggingInterceptor));
        self
    }

    /// Append `handler`; earlier registrations take precedence.
    pub fn add_request_handler(mut self, handler: Box<dyn RequestHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn add_request_interceptor(mut self, interceptor: Box<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Replace the default [`ApologyErrorHandler`].
    pub fn with_error_handler(mut self, error_handler: Box<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(error_handler);
        self
    }

    pub fn build(self) -> Skill {
        Skill {
            handlers: self.handlers,
            interceptors: self.interceptors,
            error_handler: self
                .error_handler
                .unwrap_or_else(|| Box::new(ApologyErrorHandler)),
            resolver: EndpointResolver::new(self.discovery),
            attributes: AttributesManager::new(self.store, self.settings.default_attributes),
            skill_id: self.settings.skill_id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Skill
// ─────────────────────────────────────────────────────────────────────────────

/// The assembled request dispatcher.
pub struct Skill {
    handlers: Vec<Box<dyn RequestHandler>>,
    interceptors: Vec<Box<dyn RequestInterceptor>>,
    error_handler: Box<dyn ErrorHandler>,
    resolver: EndpointResolver,
    attributes: AttributesManager,
    skill_id: Option<String>,
}

impl Skill {
    /// The standard claw skill.
    pub fn standard(
        discovery: Arc<dyn EndpointDiscovery>,
        store: Arc<dyn AttributeStore>,
        settings: SkillSettings,
    ) -> Self {
        SkillBuilder::new(discovery, store)
            .with_settings(settings)
            .with_standard_handlers()
            .build()
    }

    /// Check that `envelope` is addressed to this skill.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::SkillIdMismatch`] when a skill id is configured
    /// and the envelope carries a different (or no) application id.
    pub fn verify(&self, envelope: &RequestEnvelope) -> Result<(), SkillError> {
        let Some(expected) = &self.skill_id else {
            return Ok(());
        };
        let actual = envelope.application_id().unwrap_or_default();
        if actual == expected {
            Ok(())
        } else {
            Err(SkillError::SkillIdMismatch {
                expected: expected.clone(),
                actual: actual.to_string(),
            })
        }
    }

    /// Verify and dispatch `envelope`.
    ///
    /// # Errors
    ///
    /// Only [`SkillError::SkillIdMismatch`]; every other failure becomes a
    /// spoken response.
    pub async fn invoke(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, SkillError> {
        self.verify(&envelope)?;
        Ok(self.dispatch(envelope).await)
    }

    /// Route `envelope` to the first matching handler and build the reply.
    #[instrument(
        skip_all,
        fields(
            request_id = %envelope.request.request_id,
            request_type = %envelope.request.kind,
        )
    )]
    pub async fn dispatch(&self, mut envelope: RequestEnvelope) -> ResponseEnvelope {
        let session = envelope.take_session_attributes();
        let mut input = HandlerInput::new(&envelope, session, &self.resolver, &self.attributes);

        for interceptor in &self.interceptors {
            interceptor.process(&input);
        }

        let outcome = match self.handlers.iter().find(|h| h.can_handle(&input)) {
            Some(handler) => {
                debug!(handler = handler.name(), "handler selected");
                AssertUnwindSafe(handler.handle(&mut input))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        Err(SkillError::HandlerPanicked {
                            handler: handler.name().to_string(),
                            message: panic_message(panic.as_ref()),
                        })
                    })
            }
            None => {
                warn!("no handler matched request");
                Err(SkillError::NoHandler {
                    request_type: envelope.request.kind.to_string(),
                })
            }
        };

        let response = match outcome {
            Ok(response) => response,
            Err(err) => self.error_handler.handle(&input, &err),
        };
        ResponseEnvelope::new(response, input.into_session())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{
        APOLOGY_SPEECH, AWAITING_REPROMPT, GOODBYE_SPEECH, HELP_SPEECH, NO_GADGET_SPEECH,
        WELCOME_SPEECH,
    };
    use crate::resolver::tests::FixedDiscovery;
    use async_trait::async_trait;
    use mindclaw_store::MemoryAttributeStore;
    use mindclaw_types::{
        CONTROL_NAME, ClawCommand, DEFAULT_ROBOT_STATE, EndpointId, GADGET_NAMESPACE, Response,
    };
    use serde_json::{Value, json};

    const USER: &str = "amzn1.ask.account.user";

    fn envelope(request: Value, session_attributes: Value) -> RequestEnvelope {
        serde_json::from_value(json!({
            "version": "1.0",
            "session": {
                "new": false,
                "sessionId": "amzn1.echo-api.session.1",
                "application": { "applicationId": "amzn1.ask.skill.claw" },
                "attributes": session_attributes,
                "user": { "userId": USER }
            },
            "context": {
                "System": {
                    "application": { "applicationId": "amzn1.ask.skill.claw" },
                    "user": { "userId": USER },
                    "apiEndpoint": "https://api.amazonalexa.com",
                    "apiAccessToken": "token-123"
                }
            },
            "request": request
        }))
        .expect("valid envelope")
    }

    fn intent(name: &str, slot: Option<(&str, &str)>) -> Value {
        let slots = match slot {
            Some((slot, value)) => json!({ slot: { "name": slot, "value": value } }),
            None => json!({}),
        };
        json!({
            "type": "IntentRequest",
            "requestId": "amzn1.echo-api.request.1",
            "intent": { "name": name, "slots": slots }
        })
    }

    fn launch() -> Value {
        json!({ "type": "LaunchRequest", "requestId": "amzn1.echo-api.request.0" })
    }

    fn skill_with(discovery: Arc<FixedDiscovery>, records: Vec<(&str, Value)>) -> Skill {
        let store = MemoryAttributeStore::with_records(
            records.into_iter().map(|(k, v)| (k.to_string(), v)),
        );
        Skill::standard(discovery, Arc::new(store), SkillSettings::default())
    }

    // ── claw commands ────────────────────────────────────────────────────

    #[tokio::test]
    async fn claw_open_builds_expected_directive() {
        let discovery = Arc::new(FixedDiscovery::new(vec!["dev-other"]));
        let skill = skill_with(
            discovery.clone(),
            vec![(USER, json!({"robot": {"state": "closed"}}))],
        );
        let reply = skill
            .dispatch(envelope(
                intent("ClawOpen", Some(("ClawOpen", "A"))),
                json!({"endpointId": "dev-1"}),
            ))
            .await;

        assert_eq!(discovery.calls(), 0);
        assert!(reply.response.output_speech.is_none());
        assert_eq!(reply.response.directives.len(), 1);
        let directive = serde_json::to_value(&reply.response.directives[0]).unwrap();
        assert_eq!(directive["endpoint"]["endpointId"], "dev-1");
        assert_eq!(
            directive["payload"],
            json!({"type": "open", "state": "closed", "location": "A"})
        );
    }

    #[tokio::test]
    async fn every_claw_intent_forwards_persisted_state() {
        for cmd in ClawCommand::ALL {
            let discovery = Arc::new(FixedDiscovery::new(vec!["dev-1"]));
            let skill = skill_with(
                discovery,
                vec![(USER, json!({"robot": {"state": "half-open"}}))],
            );
            let reply = skill
                .dispatch(envelope(
                    intent(cmd.intent_name(), Some((cmd.slot_name(), "B"))),
                    json!({}),
                ))
                .await;

            let [directive] = reply.response.directives.as_slice() else {
                panic!("{} produced {} directives", cmd.intent_name(), reply.response.directives.len());
            };
            assert_eq!(directive.header.namespace, GADGET_NAMESPACE);
            assert_eq!(directive.header.name, CONTROL_NAME);
            assert_eq!(directive.payload.command, cmd);
            assert_eq!(directive.payload.state, "half-open");
            assert_eq!(directive.payload.location.as_deref(), Some("B"));
            assert_eq!(directive.endpoint_id(), &EndpointId::new("dev-1").unwrap());
        }
    }

    #[tokio::test]
    async fn close_reads_its_own_slot() {
        let skill = skill_with(Arc::new(FixedDiscovery::new(vec!["dev-1"])), vec![]);
        let reply = skill
            .dispatch(envelope(
                intent("ClawClose", Some(("ClawOpen", "wrong-slot"))),
                json!({}),
            ))
            .await;
        assert_eq!(reply.response.directives[0].payload.location, None);
    }

    #[tokio::test]
    async fn absent_attributes_use_default_record() {
        let skill = skill_with(Arc::new(FixedDiscovery::new(vec!["dev-1"])), vec![]);
        let reply = skill
            .dispatch(envelope(intent("ClawUp", None), json!({})))
            .await;
        let payload = &reply.response.directives[0].payload;
        assert_eq!(payload.state, DEFAULT_ROBOT_STATE);
        assert_eq!(payload.location, None);
    }

    #[tokio::test]
    async fn injected_default_record_is_used_verbatim() {
        let store = Arc::new(MemoryAttributeStore::new());
        let skill = Skill::standard(
            Arc::new(FixedDiscovery::new(vec!["dev-1"])),
            store,
            SkillSettings {
                default_attributes: PersistentAttributes::with_state("parked"),
                skill_id: None,
            },
        );
        let reply = skill
            .dispatch(envelope(intent("ClawDown", None), json!({})))
            .await;
        assert_eq!(reply.response.directives[0].payload.state, "parked");
    }

    #[tokio::test]
    async fn discovered_endpoint_is_echoed_in_session_attributes() {
        let skill = skill_with(Arc::new(FixedDiscovery::new(vec!["dev-9"])), vec![]);
        let reply = skill
            .dispatch(envelope(intent("ClawDance", None), json!({})))
            .await;
        assert_eq!(reply.session_attributes.endpoint_id(), EndpointId::new("dev-9"));
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["sessionAttributes"]["endpointId"], "dev-9");
    }

    #[tokio::test]
    async fn command_without_gadget_speaks_instead_of_sending() {
        let skill = skill_with(Arc::new(FixedDiscovery::new(vec![])), vec![]);
        let reply = skill
            .dispatch(envelope(intent("ClawOpen", Some(("ClawOpen", "A"))), json!({})))
            .await;
        assert!(reply.response.directives.is_empty());
        assert_eq!(reply.response.speech().as_deref(), Some(NO_GADGET_SPEECH));
    }

    #[tokio::test]
    async fn discovery_failure_becomes_apology() {
        let skill = skill_with(Arc::new(FixedDiscovery::failing()), vec![]);
        let reply = skill
            .dispatch(envelope(intent("ClawOpen", None), json!({})))
            .await;
        assert!(reply.response.directives.is_empty());
        assert_eq!(reply.response.speech().as_deref(), Some(APOLOGY_SPEECH));
    }

    #[tokio::test]
    async fn malformed_attributes_become_apology() {
        let skill = skill_with(
            Arc::new(FixedDiscovery::new(vec!["dev-1"])),
            vec![(USER, json!({"robot": 7}))],
        );
        let reply = skill
            .dispatch(envelope(intent("ClawOpen", None), json!({})))
            .await;
        assert_eq!(reply.response.speech().as_deref(), Some(APOLOGY_SPEECH));
    }

    // ── launch ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn launch_without_gadget_reports_failure() {
        let skill = skill_with(Arc::new(FixedDiscovery::new(vec![])), vec![]);
        let reply = skill.dispatch(envelope(launch(), json!({}))).await;
        assert_eq!(reply.response.speech().as_deref(), Some(NO_GADGET_SPEECH));
        assert!(reply.response.directives.is_empty());
        assert_eq!(reply.response.should_end_session, Some(true));
        assert!(reply.session_attributes.is_empty());
    }

    #[tokio::test]
    async fn launch_with_gadget_greets() {
        let skill = skill_with(Arc::new(FixedDiscovery::new(vec!["dev-1", "dev-2"])), vec![]);
        let reply = skill.dispatch(envelope(launch(), json!({}))).await;
        assert_eq!(reply.response.speech().as_deref(), Some(WELCOME_SPEECH));
        let reprompt = reply.response.reprompt.as_ref().unwrap();
        assert_eq!(reprompt.output_speech.text(), AWAITING_REPROMPT);
        assert!(reply.response.directives.is_empty());
        assert_eq!(reply.session_attributes.endpoint_id(), EndpointId::new("dev-1"));
    }

    // ── built-ins and fallbacks ──────────────────────────────────────────

    #[tokio::test]
    async fn help_and_stop_intents() {
        let skill = skill_with(Arc::new(FixedDiscovery::new(vec![])), vec![]);
        let help = skill
            .dispatch(envelope(intent("AMAZON.HelpIntent", None), json!({})))
            .await;
        assert_eq!(help.response.speech().as_deref(), Some(HELP_SPEECH));

        for name in ["AMAZON.StopIntent", "AMAZON.CancelIntent"] {
            let bye = skill.dispatch(envelope(intent(name, None), json!({}))).await;
            assert_eq!(bye.response.speech().as_deref(), Some(GOODBYE_SPEECH));
            assert_eq!(bye.response.should_end_session, Some(true));
        }
    }

    #[tokio::test]
    async fn unknown_intent_is_reflected() {
        let skill = skill_with(Arc::new(FixedDiscovery::new(vec![])), vec![]);
        let reply = skill
            .dispatch(envelope(intent("ClawSpin", None), json!({})))
            .await;
        assert_eq!(reply.response.speech().as_deref(), Some("You just triggered ClawSpin"));
    }

    #[tokio::test]
    async fn reflected_intent_name_is_escaped_in_ssml() {
        let skill = skill_with(Arc::new(FixedDiscovery::new(vec![])), vec![]);
        let reply = skill
            .dispatch(envelope(intent("Rock&Roll<Intent>", None), json!({})))
            .await;
        let wire = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            wire["response"]["outputSpeech"]["ssml"],
            "<speak>You just triggered Rock&amp;Roll&lt;Intent&gt;</speak>"
        );
        assert_eq!(
            reply.response.speech().as_deref(),
            Some("You just triggered Rock&Roll<Intent>")
        );
    }

    #[tokio::test]
    async fn null_persisted_record_uses_default_state() {
        let skill = skill_with(
            Arc::new(FixedDiscovery::new(vec!["dev-1"])),
            vec![(USER, Value::Null)],
        );
        let reply = skill
            .dispatch(envelope(intent("ClawUp", Some(("ClawUp", "B"))), json!({})))
            .await;
        assert_eq!(reply.response.directives.len(), 1);
        let directive = serde_json::to_value(&reply.response.directives[0]).unwrap();
        assert_eq!(
            directive["payload"],
            json!({"type": "up", "state": DEFAULT_ROBOT_STATE, "location": "B"})
        );
    }

    #[tokio::test]
    async fn session_ended_returns_empty_response() {
        let skill = skill_with(Arc::new(FixedDiscovery::new(vec![])), vec![]);
        let reply = skill
            .dispatch(envelope(
                json!({ "type": "SessionEndedRequest", "requestId": "r", "reason": "USER_INITIATED" }),
                json!({"endpointId": "dev-1"}),
            ))
            .await;
        assert_eq!(reply.response, Response::default());
    }

    #[tokio::test]
    async fn unmatched_request_type_becomes_apology() {
        let skill = skill_with(Arc::new(FixedDiscovery::new(vec![])), vec![]);
        let reply = skill
            .dispatch(envelope(
                json!({ "type": "CustomInterfaceController.EventsReceived", "requestId": "r" }),
                json!({}),
            ))
            .await;
        assert_eq!(reply.response.speech().as_deref(), Some(APOLOGY_SPEECH));
    }

    struct PanickingHandler;

    #[async_trait]
    impl RequestHandler for PanickingHandler {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn can_handle(&self, _input: &HandlerInput<'_>) -> bool {
            true
        }

        async fn handle(&self, _input: &mut HandlerInput<'_>) -> Result<Response, SkillError> {
            panic!("gadget table corrupted");
        }
    }

    #[tokio::test]
    async fn handler_panic_becomes_apology() {
        let skill = SkillBuilder::new(
            Arc::new(FixedDiscovery::new(vec![])),
            Arc::new(MemoryAttributeStore::new()),
        )
        .add_request_handler(Box::new(PanickingHandler))
        .build();
        let reply = skill.dispatch(envelope(launch(), json!({}))).await;
        assert_eq!(reply.response.speech().as_deref(), Some(APOLOGY_SPEECH));
    }

    #[test]
    fn panic_message_extracts_strings() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }

    // ── skill id ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn invoke_rejects_foreign_skill_id() {
        let skill = Skill::standard(
            Arc::new(FixedDiscovery::new(vec!["dev-1"])),
            Arc::new(MemoryAttributeStore::new()),
            SkillSettings {
                skill_id: Some("amzn1.ask.skill.other".to_string()),
                ..Default::default()
            },
        );
        let result = skill.invoke(envelope(launch(), json!({}))).await;
        assert!(matches!(result, Err(SkillError::SkillIdMismatch { .. })));
    }

    #[tokio::test]
    async fn invoke_accepts_matching_skill_id() {
        let skill = Skill::standard(
            Arc::new(FixedDiscovery::new(vec!["dev-1"])),
            Arc::new(MemoryAttributeStore::new()),
            SkillSettings {
                skill_id: Some("amzn1.ask.skill.claw".to_string()),
                ..Default::default()
            },
        );
        let reply = skill.invoke(envelope(launch(), json!({}))).await.unwrap();
        assert_eq!(reply.response.speech().as_deref(), Some(WELCOME_SPEECH));
    }
}
