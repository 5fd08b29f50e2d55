//! `mindclaw-runtime` – The Skill Engine
//!
//! Turns one platform request into one platform response.
//!
//! # Modules
//!
//! - [`discovery`] – [`EndpointDiscovery`][discovery::EndpointDiscovery] and
//!   its `reqwest`-based [`HttpEndpointDiscovery`][discovery::HttpEndpointDiscovery],
//!   which lists the gadgets paired with the calling device.
//! - [`resolver`] – [`EndpointResolver`][resolver::EndpointResolver]: returns
//!   the single gadget endpoint for a request, caching it in the session so
//!   discovery runs at most once per session.
//! - [`handler`] – [`HandlerInput`][handler::HandlerInput] plus the
//!   [`RequestHandler`][handler::RequestHandler],
//!   [`RequestInterceptor`][handler::RequestInterceptor] and
//!   [`ErrorHandler`][handler::ErrorHandler] seams.
//! - [`handlers`] – launch, claw command, help, cancel/stop, session-ended
//!   and intent-reflector handlers, the logging interceptor and the apology
//!   error handler.
//! - [`skill`] – [`Skill`][skill::Skill]: first-match dispatch over the
//!   registered handlers; every failure ends as a spoken response.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console /
//!   JSON logs with optional OTLP span export.

pub mod discovery;
pub mod handler;
pub mod handlers;
pub mod resolver;
pub mod skill;
pub mod telemetry;

pub use discovery::{ConnectedEndpoint, DiscoveryError, EndpointDiscovery, HttpEndpointDiscovery};
pub use handler::{AttributesManager, ErrorHandler, HandlerInput, RequestHandler, RequestInterceptor};
pub use resolver::EndpointResolver;
pub use skill::{Skill, SkillBuilder, SkillSettings};
pub use telemetry::{TracerProviderGuard, init_tracing};
