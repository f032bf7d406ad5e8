//! HTTP Handlers

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use concierge_core::{
    stream::{sse_frame, EVENT_STREAM_CONTENT_TYPE},
    Conversation, DispatchLoop, Turn,
};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider_connected: bool,
    pub tools_registered: usize,
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub history: Vec<Turn>,
}

#[derive(Serialize)]
pub struct ToolListResponse {
    pub tools: Vec<String>,
}

#[derive(Serialize)]
pub struct UserStatusResponse {
    pub user_id: String,
    pub tier: String,
    pub model_queries_left: u32,
    pub external_lookups_left: u32,
    pub file_operations_left: u32,
    pub reset_date: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

/// Extract the already-authenticated user identity. Credential checks
/// happen upstream; the backend only sees an opaque id.
fn user_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| {
            api_error(
                StatusCode::UNAUTHORIZED,
                "Missing user identity",
                "MISSING_IDENTITY",
            )
        })
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider_connected,
        tools_registered: state.registry.len(),
    })
}

/// Sorted list of registered tool names
pub async fn list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.registry.names(),
    })
}

/// Current tier and remaining quota for the calling user
pub async fn user_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserStatusResponse>, ApiError> {
    let user = user_id(&headers)?;

    let record = state.ledger.status(&user).map_err(|e| {
        tracing::error!(user = %user, error = %e, "Failed to load quota record");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.user_message(),
            "ACCOUNT_ERROR",
        )
    })?;

    Ok(Json(UserStatusResponse {
        user_id: record.user_id,
        tier: record.tier.to_string(),
        model_queries_left: record.model_queries_left,
        external_lookups_left: record.external_lookups_left,
        file_operations_left: record.file_operations_left,
        reset_date: record.reset_date.to_string(),
    }))
}

/// Main prompt endpoint: runs one dispatch loop and streams its events
/// back as server-sent frames.
pub async fn prompt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PromptRequest>,
) -> Result<Response, ApiError> {
    let user = user_id(&headers)?;

    if payload.history.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "History must contain at least one turn",
            "EMPTY_HISTORY",
        ));
    }

    let request_id = uuid::Uuid::new_v4();
    tracing::info!(user = %user, %request_id, turns = payload.history.len(), "Prompt received");

    let conversation = Conversation::from_turns(&payload.history);

    let dispatch = DispatchLoop::new(
        state.provider.clone(),
        state.registry.clone(),
        state.ledger.clone(),
        state.dispatch_config.clone(),
    );

    // The loop writes into a bounded channel; the response body drains
    // it. Dropping the body (client disconnect) closes the channel and
    // the loop stops on its next send.
    let (tx, rx) = mpsc::channel(state.event_buffer);

    tokio::spawn(async move {
        let outcome = dispatch.run(&user, conversation, tx).await;
        tracing::info!(user = %user, %request_id, ?outcome, "Dispatch finished");
    });

    let frames = ReceiverStream::new(rx)
        .map(|event| Ok::<_, std::convert::Infallible>(sse_frame(&event)));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, EVENT_STREAM_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(frames))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build stream response");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not open response stream",
                "STREAM_ERROR",
            )
        })
}
