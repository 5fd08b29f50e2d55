//! Session opening: greets the user once a gadget is found.

use async_trait::async_trait;
use mindclaw_types::{RequestType, Response, ResponseBuilder, SkillError};
use tracing::info;

use super::{AWAITING_REPROMPT, WELCOME_SPEECH, no_gadget_response};
use crate::handler::{HandlerInput, RequestHandler};

/// Greets the user when the skill is opened, after checking a gadget is paired.
pub struct LaunchHandler;

#[async_trait]
impl RequestHandler for LaunchHandler {
    fn name(&self) -> &'static str {
        "launch"
    }

    fn can_handle(&self, input: &HandlerInput<'_>) -> bool {
        *input.request_type() == RequestType::Launch
    }

    async fn handle(&self, input: &mut HandlerInput<'_>) -> Result<Response, SkillError> {
        let Some(endpoint) = input.resolve_endpoint().await? else {
            return Ok(no_gadget_response());
        };
        info!(%endpoint, "skill launched with gadget connected");
        Ok(ResponseBuilder::new()
            .speak(WELCOME_SPEECH)
            .reprompt(AWAITING_REPROMPT)
            .build())
    }
}
