use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gbalance_core::GatewayError;
use serde_json::json;

/// `{"error": {"code", "message", "status"}}`, the shape both protocol
/// families' clients understand.
pub fn error_response(err: &GatewayError) -> Response {
    error_body(err.status(), err.status_name(), &err.to_string())
}

pub fn error_body(status: StatusCode, status_name: &str, message: &str) -> Response {
    let body = json!({
        "error": {
            "code": status.as_u16(),
            "message": message,
            "status": status_name,
        }
    });
    (status, Json(body)).into_response()
}
