//! [`EndpointResolver`] – finds the gadget a directive should go to.
//!
//! The session attributes act as a per-session cache: the first successful
//! discovery stores the endpoint there and every later turn of the same
//! session is served without I/O.

use std::sync::Arc;

use mindclaw_types::{EndpointId, SessionAttributes, SystemContext};
use tracing::{debug, info, instrument};

use crate::discovery::{DiscoveryError, EndpointDiscovery};

/// Resolves the single gadget endpoint for a request.
#[derive(Clone)]
pub struct EndpointResolver {
    discovery: Arc<dyn EndpointDiscovery>,
}

impl EndpointResolver {
    pub fn new(discovery: Arc<dyn EndpointDiscovery>) -> Self {
        Self { discovery }
    }

    /// Return the connected endpoint, consulting `session` first.
    ///
    /// * cached non-empty id → returned as-is, no discovery call;
    /// * otherwise one discovery query; the first listed endpoint is cached
    ///   in `session` and returned;
    /// * no endpoint listed → `Ok(None)` and `session` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::MissingCredentials`] when the request has no
    /// API address or token, or the discovery client's error.
    #[instrument(skip_all)]
    pub async fn resolve(
        &self,
        session: &mut SessionAttributes,
        system: &SystemContext,
    ) -> Result<Option<EndpointId>, DiscoveryError> {
        if let Some(cached) = session.endpoint_id() {
            debug!(endpoint = %cached, "endpoint served from session cache");
            return Ok(Some(cached));
        }

        let token = system
            .api_access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(DiscoveryError::MissingCredentials)?;
        if system.api_endpoint.is_empty() {
            return Err(DiscoveryError::MissingCredentials);
        }

        let endpoints = self
            .discovery
            .list_connected_endpoints(&system.api_endpoint, token)
            .await?;
        debug!(count = endpoints.len(), "discovery returned endpoints");

        let first = endpoints
            .into_iter()
            .next()
            .and_then(|e| e.endpoint_id)
            .and_then(EndpointId::new);

        match first {
            Some(endpoint) => {
                info!(%endpoint, "gadget endpoint discovered");
                session.set_endpoint_id(&endpoint);
                Ok(Some(endpoint))
            }
            None => {
                info!("no gadget connected");
                Ok(None)
            }
        }
    }
}
