//! [`SkillServer`] – HTTP endpoint for the skill.
//!
//! Listens on `0.0.0.0:8080` (configurable via [`SkillServer::with_port`]).

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mindclaw_runtime::Skill;
use mindclaw_types::{RequestEnvelope, ResponseEnvelope, SkillError};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Default TCP port for the skill webhook.
pub const DEFAULT_PORT: u16 = 8080;

/// Errors that stop the server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("bind error on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: &'static str,
    message: String,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Build the webhook router around `skill`.
pub fn router(skill: Arc<Skill>) -> Router {
    Router::new()
        .route("/", post(skill_request))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(skill)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn skill_request(
    State(skill): State<Arc<Skill>>,
    Json(envelope): Json<RequestEnvelope>,
) -> Result<Json<ResponseEnvelope>, Response> {
    match skill.invoke(envelope).await {
        Ok(reply) => Ok(Json(reply)),
        Err(err @ SkillError::SkillIdMismatch { .. }) => {
            warn!(error = %err, "refusing request for another skill");
            Err((
                StatusCode::FORBIDDEN,
                Json(ErrorBody {
                    code: "SKILL_ID_MISMATCH",
                    message: err.to_string(),
                }),
            )
                .into_response())
        }
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                code: "INTERNAL",
                message: err.to_string(),
            }),
        )
            .into_response()),
    }
}

// ---------------------------------------------------------------------------
// SkillServer
// ---------------------------------------------------------------------------

/// HTTP server hosting one [`Skill`].
pub struct SkillServer {
    skill: Arc<Skill>,
    port: u16,
}

impl SkillServer {
    /// Create a server for `skill` on the [`DEFAULT_PORT`].
    pub fn new(skill: Arc<Skill>) -> Self {
        Self {
            skill,
            port: DEFAULT_PORT,
        }
    }

    /// Override the listening port (builder-style).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until the process is killed.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the port cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        info!(port = self.port, "skill webhook listening");

        axum::serve(listener, router(self.skill))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)?;

        info!("skill webhook stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use mindclaw_runtime::{ConnectedEndpoint, DiscoveryError, EndpointDiscovery, SkillSettings};
    use mindclaw_store::MemoryAttributeStore;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct OneGadget;

    #[async_trait]
    impl EndpointDiscovery for OneGadget {
        async fn list_connected_endpoints(
            &self,
            _api_endpoint: &str,
            _access_token: &str,
        ) -> Result<Vec<ConnectedEndpoint>, DiscoveryError> {
            Ok(vec![ConnectedEndpoint {
                endpoint_id: Some("dev-1".to_string()),
                friendly_name: Some("EV3_A1".to_string()),
            }])
        }
    }

    fn app(skill_id: Option<&str>) -> Router {
        let skill = Skill::standard(
            Arc::new(OneGadget),
            Arc::new(MemoryAttributeStore::new()),
            SkillSettings {
                skill_id: skill_id.map(str::to_string),
                ..Default::default()
            },
        );
        router(Arc::new(skill))
    }

    fn claw_open() -> Value {
        json!({
            "version": "1.0",
            "session": {
                "new": true,
                "sessionId": "s-1",
                "application": { "applicationId": "amzn1.ask.skill.claw" },
                "user": { "userId": "u-1" }
            },
            "context": {
                "System": {
                    "application": { "applicationId": "amzn1.ask.skill.claw" },
                    "user": { "userId": "u-1" },
                    "apiEndpoint": "https://api.amazonalexa.com",
                    "apiAccessToken": "token"
                }
            },
            "request": {
                "type": "IntentRequest",
                "requestId": "r-1",
                "intent": { "name": "ClawOpen", "slots": { "ClawOpen": { "name": "ClawOpen", "value": "A" } } }
            }
        })
    }

    fn post_json(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app(None)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn skill_request_returns_directive_envelope() {
        let response = app(None).oneshot(post_json(&claw_open())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["version"], "1.0");
        assert_eq!(body["sessionAttributes"]["endpointId"], "dev-1");
        let directive = &body["response"]["directives"][0];
        assert_eq!(directive["header"]["namespace"], "Custom.Mindstorms.Gadget");
        assert_eq!(
            directive["payload"],
            json!({ "type": "open", "state": "closed", "location": "A" })
        );
        assert!(body["response"].get("outputSpeech").is_none());
    }

    #[tokio::test]
    async fn foreign_skill_id_is_forbidden() {
        let response = app(Some("amzn1.ask.skill.other"))
            .oneshot(post_json(&claw_open()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["code"], "SKILL_ID_MISMATCH");
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let response = app(None)
            .oneshot(post_json(&json!({ "request": "nope" })))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[test]
    fn server_port_override() {
        let skill = Skill::standard(
            Arc::new(OneGadget),
            Arc::new(MemoryAttributeStore::new()),
            SkillSettings::default(),
        );
        let server = SkillServer::new(Arc::new(skill));
        assert_eq!(server.port(), DEFAULT_PORT);
        assert_eq!(server.with_port(9443).port(), 9443);
    }
}
