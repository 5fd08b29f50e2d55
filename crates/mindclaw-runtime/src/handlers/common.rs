//! Built-in intents, the catch-all reflector, logging and the apology path.

use async_trait::async_trait;
use mindclaw_types::{RequestType, Response, ResponseBuilder, SkillError};
use tracing::{error, info};

use super::{APOLOGY_SPEECH, GOODBYE_SPEECH, HELP_SPEECH};
use crate::handler::{ErrorHandler, HandlerInput, RequestHandler, RequestInterceptor};

const HELP_INTENT: &str = "AMAZON.HelpIntent";
const CANCEL_INTENT: &str = "AMAZON.CancelIntent";
const STOP_INTENT: &str = "AMAZON.StopIntent";

pub struct HelpHandler;

#[async_trait]
impl RequestHandler for HelpHandler {
    fn name(&self) -> &'static str {
        "help"
    }

    fn can_handle(&self, input: &HandlerInput<'_>) -> bool {
        input.intent_name() == Some(HELP_INTENT)
    }

    async fn handle(&self, _input: &mut HandlerInput<'_>) -> Result<Response, SkillError> {
        Ok(ResponseBuilder::new()
            .speak(HELP_SPEECH)
            .reprompt(HELP_SPEECH)
            .build())
    }
}

pub struct CancelAndStopHandler;

#[async_trait]
impl RequestHandler for CancelAndStopHandler {
    fn name(&self) -> &'static str {
        "cancel-stop"
    }

    fn can_handle(&self, input: &HandlerInput<'_>) -> bool {
        matches!(input.intent_name(), Some(CANCEL_INTENT | STOP_INTENT))
    }

    async fn handle(&self, _input: &mut HandlerInput<'_>) -> Result<Response, SkillError> {
        Ok(ResponseBuilder::new()
            .speak(GOODBYE_SPEECH)
            .with_should_end_session(true)
            .build())
    }
}

/// Acknowledges the end of a session; the platform ignores any speech here.
pub struct SessionEndedHandler;

#[async_trait]
impl RequestHandler for SessionEndedHandler {
    fn name(&self) -> &'static str {
        "session-ended"
    }

    fn can_handle(&self, input: &HandlerInput<'_>) -> bool {
        *input.request_type() == RequestType::SessionEnded
    }

    async fn handle(&self, input: &mut HandlerInput<'_>) -> Result<Response, SkillError> {
        info!(
            reason = input.envelope().request.reason.as_deref().unwrap_or("unknown"),
            "session ended"
        );
        Ok(Response::default())
    }
}

/// Echoes the name of any intent nothing else claimed.
pub struct IntentReflectorHandler;

#[async_trait]
impl RequestHandler for IntentReflectorHandler {
    fn name(&self) -> &'static str {
        "intent-reflector"
    }

    fn can_handle(&self, input: &HandlerInput<'_>) -> bool {
        *input.request_type() == RequestType::Intent
    }

    async fn handle(&self, input: &mut HandlerInput<'_>) -> Result<Response, SkillError> {
        let name = input.intent_name().unwrap_or("an unnamed intent");
        Ok(ResponseBuilder::new()
            .speak(&format!("You just triggered {name}"))
            .build())
    }
}

/// Logs every inbound request.
pub struct LoggingInterceptor;

impl RequestInterceptor for LoggingInterceptor {
    fn process(&self, input: &HandlerInput<'_>) {
        let request = &input.envelope().request;
        info!(
            request_id = %request.request_id,
            request_type = %request.kind,
            intent = input.intent_name().unwrap_or("-"),
            new_session = input.envelope().session.as_ref().is_some_and(|s| s.new),
            "inbound request"
        );
    }
}

/// Converts every failure into the same spoken apology.
pub struct ApologyErrorHandler;

impl ErrorHandler for ApologyErrorHandler {
    fn handle(&self, input: &HandlerInput<'_>, err: &SkillError) -> Response {
        error!(
            error = %err,
            request_id = %input.envelope().request.request_id,
            "request failed"
        );
        ResponseBuilder::new()
            .speak(APOLOGY_SPEECH)
            .reprompt(APOLOGY_SPEECH)
            .build()
    }
}
