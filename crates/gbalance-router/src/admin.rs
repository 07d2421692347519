use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use gbalance_core::Gateway;
use gbalance_core::auth::bearer_token;
use gbalance_provider_core::KeyStatus;

use crate::error::{error_body, error_response};

#[derive(Clone)]
pub struct AdminState {
    pub gateway: Arc<Gateway>,
}

#[derive(Debug, Serialize)]
struct KeyStatusList {
    keys: Vec<KeyStatus>,
}

/// Key health inspection and reset, authenticated with the configured
/// admin bearer token.
pub fn admin_router(gateway: Arc<Gateway>) -> Router {
    let state = AdminState { gateway };

    Router::new()
        .route("/health", get(health))
        .route("/keys", get(list_keys))
        .route("/keys/reset", post(reset_all_keys))
        .route("/keys/{key}/reset", post(reset_key))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "ok": true })))
}

async fn list_keys(State(state): State<AdminState>, headers: HeaderMap) -> Response {
    let token = bearer_token(&headers);
    match state.gateway.key_statuses(token.as_ref()).await {
        Ok(keys) => Json(KeyStatusList { keys }).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn reset_key(
    State(state): State<AdminState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    let token = bearer_token(&headers);
    match state.gateway.reset_key(token.as_ref(), &key).await {
        Ok(true) => Json(serde_json::json!({ "ok": true })).into_response(),
        Ok(false) => error_body(StatusCode::NOT_FOUND, "NOT_FOUND", "unknown key"),
        Err(err) => error_response(&err),
    }
}

async fn reset_all_keys(State(state): State<AdminState>, headers: HeaderMap) -> Response {
    let token = bearer_token(&headers);
    match state.gateway.reset_all_keys(token.as_ref()).await {
        Ok(()) => Json(serde_json::json!({ "ok": true })).into_response(),
        Err(err) => error_response(&err),
    }
}
