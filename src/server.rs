//! HTTP transport shim for the tool-invocation protocol
//!
//! Deserializes `{"tool": name, "input": {...}}` requests and serializes
//! `{"result": ...}` / `{"error": ...}` responses. Everything interesting
//! happens behind the dispatcher; this layer only maps errors to status
//! codes.

use crate::dispatcher::ToolDispatcher;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ToolDispatcher>,
}

/// Incoming tool invocation
#[derive(Debug, Deserialize)]
pub struct ToolCall {
    tool: String,
    #[serde(default)]
    input: Value,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/mcp", post(invoke_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn invoke_handler(
    State(state): State<AppState>,
    payload: Result<Json<ToolCall>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Json(call) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": rejection.body_text()})),
            )
        }
    };

    if call.tool.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing tool name"})),
        );
    }

    match state.dispatcher.dispatch(&call.tool, &call.input).await {
        Ok(result) => (StatusCode::OK, Json(json!({"result": result}))),
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({"error": e.to_string()})))
        }
    }
}
