//! [`EndpointDiscovery`] – lists the gadgets paired with the calling device.
//!
//! The production implementation, [`HttpEndpointDiscovery`], queries the
//! platform's `GET /v1/endpoints` API using the per-request access token
//! carried in `context.System`.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise while listing connected endpoints.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The HTTP request failed, returned an error status, or had a bad body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The request envelope carried no API address or access token.
    #[error("Request carries no platform API credentials")]
    MissingCredentials,
}

// ─────────────────────────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of the endpoint listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEndpoint {
    #[serde(default)]
    pub endpoint_id: Option<String>,
    #[serde(default)]
    pub friendly_name: Option<String>,
}

// `endpoints` may be absent or `null`; both mean nothing is connected.
#[derive(Deserialize)]
struct EndpointsResponse {
    #[serde(default)]
    endpoints: Option<Vec<ConnectedEndpoint>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Trait + HTTP implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Source of the gadgets connected to the requesting device.
#[async_trait]
pub trait EndpointDiscovery: Send + Sync {
    /// List connected endpoints in platform order.
    async fn list_connected_endpoints(
        &self,
        api_endpoint: &str,
        access_token: &str,
    ) -> Result<Vec<ConnectedEndpoint>, DiscoveryError>;
}

/// [`EndpointDiscovery`] backed by the platform's REST API.
///
/// Construct once and share across requests; the inner `reqwest::Client`
/// pools connections.
#[derive(Debug, Clone, Default)]
pub struct HttpEndpointDiscovery {
    client: reqwest::Client,
}

impl HttpEndpointDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing client (e.g. one with custom TLS settings).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EndpointDiscovery for HttpEndpointDiscovery {
    async fn list_connected_endpoints(
        &self,
        api_endpoint: &str,
        access_token: &str,
    ) -> Result<Vec<ConnectedEndpoint>, DiscoveryError> {
        let url = format!("{}/v1/endpoints", api_endpoint.trim_end_matches('/'));
        tracing::debug!(%url, "listing connected endpoints");

        let response: EndpointsResponse = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.endpoints.unwrap_or_default())
    }
}
