//! The skill's request handlers, in registration order.

mod claw;
mod common;
mod launch;

pub use claw::ClawCommandHandler;
pub use common::{
    ApologyErrorHandler, CancelAndStopHandler, HelpHandler, IntentReflectorHandler,
    LoggingInterceptor, SessionEndedHandler,
};
pub use launch::LaunchHandler;

use mindclaw_types::{Response, ResponseBuilder};

use crate::handler::RequestHandler;

pub const NO_GADGET_SPEECH: &str = "I couldn't find an EV3 Brick connected to this Echo device.";
pub const WELCOME_SPEECH: &str = "Welcome, you can start issuing commands";
pub const AWAITING_REPROMPT: &str = "Awaiting commands";
pub const HELP_SPEECH: &str =
    "You can say open, close, up, down or dance to control the claw. What would you like to do?";
pub const GOODBYE_SPEECH: &str = "Goodbye!";
pub const APOLOGY_SPEECH: &str = "Sorry, I had trouble doing what you asked. Please try again.";

/// Handlers in the order they are consulted.
///
/// The reflector accepts every intent request, so it must stay last.
pub fn standard_handlers() -> Vec<Box<dyn RequestHandler>> {
    vec![
        Box::new(LaunchHandler),
        Box::new(ClawCommandHandler),
        Box::new(HelpHandler),
        Box::new(CancelAndStopHandler),
        Box::new(SessionEndedHandler),
        Box::new(IntentReflectorHandler),
    ]
}

/// Spoken reply when no gadget is paired; no directive, session ends.
pub(crate) fn no_gadget_response() -> Response {
    ResponseBuilder::new()
        .speak(NO_GADGET_SPEECH)
        .with_should_end_session(true)
        .build()
}
