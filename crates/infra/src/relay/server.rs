//! Relay HTTP routes
//!
//! - `POST /api/callback` `{code, codeVerifier}` → provider token response
//! - `POST /api/spotify/refresh-token` `{refreshToken}` →
//!   `{access_token, expires_in, refresh_token?}`
//! - `GET /health` → `{"status":"ok"}`
//!
//! Provider rejections become `400 {error}`; failing to reach the provider
//! becomes `502 {error}`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use spoticizr_domain::constants::{RELAY_EXCHANGE_PATH, RELAY_HEALTH_PATH, RELAY_REFRESH_PATH};
use spoticizr_domain::{Config, SpoticizrError};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::token_endpoint::{TokenEndpointClient, TokenEndpointError};
use crate::errors::InfraError;

const EXCHANGE_FALLBACK_MESSAGE: &str = "Token exchange failed";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest {
    code: String,
    code_verifier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Debug, Serialize)]
struct RefreshReply {
    access_token: String,
    expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// Shared state for relay handlers
#[derive(Clone)]
pub struct RelayState {
    endpoint: Arc<TokenEndpointClient>,
}

impl RelayState {
    #[must_use]
    pub fn new(endpoint: TokenEndpointClient) -> Self {
        Self { endpoint: Arc::new(endpoint) }
    }
}

/// Build the relay router
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route(RELAY_EXCHANGE_PATH, post(exchange))
        .route(RELAY_REFRESH_PATH, post(refresh))
        .route(RELAY_HEALTH_PATH, get(health))
        .with_state(state)
}

/// Serve the relay on `config.relay.bind` until `shutdown` is cancelled
///
/// # Errors
/// Returns error if the bind address is invalid or cannot be bound.
pub async fn serve(config: &Config, shutdown: CancellationToken) -> Result<(), SpoticizrError> {
    let addr: SocketAddr = config.relay.bind.parse().map_err(|e| {
        SpoticizrError::Config(format!("invalid relay bind address {}: {e}", config.relay.bind))
    })?;
    let endpoint = TokenEndpointClient::new(config)?;

    let listener = TcpListener::bind(addr).await.map_err(|e| SpoticizrError::from(InfraError::from(e)))?;
    let local = listener.local_addr().map_err(|e| SpoticizrError::from(InfraError::from(e)))?;
    info!(addr = %local, token_url = %config.relay.token_url, "Token relay listening");

    axum::serve(listener, router(RelayState::new(endpoint)))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| SpoticizrError::Network(format!("relay server failed: {e}")))?;

    info!("Token relay stopped");
    Ok(())
}

async fn exchange(
    State(state): State<RelayState>,
    payload: Result<Json<ExchangeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_request(rejection),
    };

    match state.endpoint.exchange_code(&request.code, &request.code_verifier).await {
        Ok(tokens) => {
            info!(expires_in = tokens.expires_in, "Authorization code exchanged");
            Json(tokens).into_response()
        }
        Err(e @ TokenEndpointError::Rejected { .. }) => {
            let message = e.description().unwrap_or_else(|| EXCHANGE_FALLBACK_MESSAGE.to_string());
            warn!(error = %message, "Provider rejected code exchange");
            error_reply(StatusCode::BAD_REQUEST, Value::String(message))
        }
        Err(e) => upstream_failure(&e),
    }
}

async fn refresh(
    State(state): State<RelayState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_request(rejection),
    };

    match state.endpoint.refresh(&request.refresh_token).await {
        Ok(tokens) => {
            info!(
                expires_in = tokens.expires_in,
                rotated = tokens.refresh_token.is_some(),
                "Access token refreshed"
            );
            Json(RefreshReply {
                access_token: tokens.access_token,
                expires_in: tokens.expires_in,
                refresh_token: tokens.refresh_token,
            })
            .into_response()
        }
        Err(TokenEndpointError::Rejected { status, body }) => {
            warn!(status, "Provider rejected refresh");
            error_reply(StatusCode::BAD_REQUEST, body)
        }
        Err(e) => upstream_failure(&e),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn bad_request(rejection: JsonRejection) -> Response {
    warn!(error = %rejection.body_text(), "Malformed relay request");
    error_reply(StatusCode::BAD_REQUEST, Value::String(rejection.body_text()))
}

fn upstream_failure(err: &TokenEndpointError) -> Response {
    error!(error = %err, "Token endpoint call failed");
    error_reply(StatusCode::BAD_GATEWAY, Value::String(err.to_string()))
}

fn error_reply(status: StatusCode, error: Value) -> Response {
    (status, Json(json!({ "error": error }))).into_response()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn app(token_url: &str) -> Router {
        let endpoint = TokenEndpointClient::with_token_url(
            token_url,
            "client-123",
            "http://127.0.0.1:8888/callback",
            Duration::from_secs(5),
        )
        .unwrap();
        router(RelayState::new(endpoint))
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app("http://127.0.0.1:9/api/token")
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn exchange_forwards_token_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("code_verifier=V1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "AT1",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "RT1",
                "scope": "user-read-email"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(post_json("/api/callback", &json!({ "code": "C1", "codeVerifier": "V1" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["access_token"], "AT1");
        assert_eq!(body["refresh_token"], "RT1");
        assert_eq!(body["expires_in"], 3600);
    }

    #[tokio::test]
    async fn exchange_rejection_uses_error_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid authorization code"
            })))
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(post_json("/api/callback", &json!({ "code": "C1", "codeVerifier": "V1" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({ "error": "Invalid authorization code" }));
    }

    #[tokio::test]
    async fn refresh_returns_reduced_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("refresh_token=RT1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "AT2",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "user-read-email"
            })))
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(post_json("/api/spotify/refresh-token", &json!({ "refreshToken": "RT1" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "access_token": "AT2", "expires_in": 3600 }));
    }

    #[tokio::test]
    async fn refresh_rejection_forwards_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })),
            )
            .mount(&server)
            .await;

        let response = app(&server.uri())
            .oneshot(post_json("/api/spotify/refresh-token", &json!({ "refreshToken": "RT1" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({ "error": { "error": "invalid_grant" } }));
    }

    #[tokio::test]
    async fn unreachable_provider_is_bad_gateway() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let response = app(&format!("http://{addr}/api/token"))
            .oneshot(post_json("/api/spotify/refresh-token", &json!({ "refreshToken": "RT1" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let response = app("http://127.0.0.1:9/api/token")
            .oneshot(post_json("/api/callback", &json!({ "code": "C1" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }
}
