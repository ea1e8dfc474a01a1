//! HTTP surface: one chat-completion endpoint plus liveness, with a uniform
//! error envelope.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, extract::State};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::pipeline::Pipeline;
use crate::types::ChatCompletionRequest;
use crate::{RelayError, aliases};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/health", get(health))
        .with_state(state)
}

async fn chat_completions(
    State(state): State<AppState>,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    match state.pipeline.handle(request).await {
        Ok(body) => (StatusCode::OK, Json(Value::Object(body))).into_response(),
        Err(err) => {
            warn!(error = %err, "request failed");
            error_response(err).into_response()
        }
    }
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

fn envelope(
    status: StatusCode,
    kind: &'static str,
    code: Option<&'static str>,
    message: impl std::fmt::Display,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: ErrorDetail {
                message: message.to_string(),
                kind,
                code,
            },
        }),
    )
}

/// Maps each failure class to a distinct status/code so clients can tell
/// user error, overload, and backend failure apart.
fn error_response(err: RelayError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        RelayError::UnsupportedModel { .. } => {
            let supported = aliases::supported_ids().collect::<Vec<_>>().join(", ");
            envelope(
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                Some("unsupported_model"),
                format!("{err} (supported: {supported})"),
            )
        }
        RelayError::Signing(_) => envelope(
            StatusCode::INTERNAL_SERVER_ERROR,
            "api_error",
            Some("signing_failed"),
            err,
        ),
        // Backpressure, not a backend failure.
        RelayError::QueueTimeout { .. } => envelope(
            StatusCode::SERVICE_UNAVAILABLE,
            "overloaded_error",
            Some("queue_timeout"),
            err,
        ),
        RelayError::Api { status, body } => {
            let status =
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            envelope(status, "api_error", Some("upstream_error"), body)
        }
        RelayError::Transport(_) => envelope(
            StatusCode::BAD_GATEWAY,
            "api_error",
            Some("upstream_unreachable"),
            err,
        ),
        RelayError::UnexpectedBackendShape(_) => envelope(
            StatusCode::BAD_GATEWAY,
            "api_error",
            Some("bad_upstream_response"),
            err,
        ),
        RelayError::Json(_)
        | RelayError::Io(_)
        | RelayError::Config(_)
        | RelayError::Internal(_) => {
            envelope(StatusCode::INTERNAL_SERVER_ERROR, "api_error", None, err)
        }
    }
}
