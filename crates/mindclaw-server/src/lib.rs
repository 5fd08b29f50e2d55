//! `mindclaw-server` – The Skill Webhook
//!
//! Exposes a [`Skill`][mindclaw_runtime::Skill] over HTTPS-terminated HTTP
//! the way the voice platform calls custom skill endpoints:
//!
//! 1. **`POST /`** – body is a request envelope, reply is the response
//!    envelope produced by the skill.  Requests addressed to another skill id
//!    are refused with `403`.
//! 2. **`GET /health`** – liveness probe.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mindclaw_runtime::{HttpEndpointDiscovery, Skill, SkillSettings};
//! use mindclaw_server::SkillServer;
//! use mindclaw_store::MemoryAttributeStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let skill = Skill::standard(
//!         Arc::new(HttpEndpointDiscovery::new()),
//!         Arc::new(MemoryAttributeStore::new()),
//!         SkillSettings::default(),
//!     );
//!     SkillServer::new(Arc::new(skill))
//!         .run()
//!         .await
//!         .expect("skill server failed");
//! }
//! ```

pub mod server;

pub use server::{DEFAULT_PORT, ServerError, SkillServer, router};
