//! The claw command handler.
//!
//! All five claw intents share one body; [`ClawCommand`] supplies the
//! per-intent keyword and slot name.

use async_trait::async_trait;
use mindclaw_types::{
    ClawCommand, ControlPayload, Directive, RequestType, Response, ResponseBuilder, SkillError,
};
use tracing::info;

use super::no_gadget_response;
use crate::handler::{HandlerInput, RequestHandler};

fn command_for(input: &HandlerInput<'_>) -> Option<ClawCommand> {
    if *input.request_type() != RequestType::Intent {
        return None;
    }
    input.intent_name().and_then(ClawCommand::from_intent_name)
}

/// Sends one `control` directive per claw intent.
pub struct ClawCommandHandler;

#[async_trait]
impl RequestHandler for ClawCommandHandler {
    fn name(&self) -> &'static str {
        "claw-command"
    }

    fn can_handle(&self, input: &HandlerInput<'_>) -> bool {
        command_for(input).is_some()
    }

    async fn handle(&self, input: &mut HandlerInput<'_>) -> Result<Response, SkillError> {
        let command = command_for(input).ok_or_else(|| SkillError::NoHandler {
            request_type: input.request_type().to_string(),
        })?;
        let location = input
            .envelope()
            .slot_value(command.slot_name())
            .map(str::to_string);

        let Some(endpoint) = input.resolve_endpoint().await? else {
            return Ok(no_gadget_response());
        };

        let attributes = input.persistent_attributes().await?;

        info!(
            %endpoint,
            command = command.keyword(),
            state = attributes.state(),
            location = location.as_deref().unwrap_or("-"),
            "sending claw directive"
        );

        let directive = Directive::control(
            endpoint,
            ControlPayload {
                command,
                state: attributes.robot.state,
                location,
            },
        );
        Ok(ResponseBuilder::new().add_directive(directive).build())
    }
}
