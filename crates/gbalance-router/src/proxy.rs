use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, RawQuery, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Router};
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use gbalance_core::auth::{bearer_token, native_token};
use gbalance_core::{Gateway, GatewayResponse, GenerateCall, InboundProtocol, InboundRequest};

use crate::error::{error_body, error_response};

#[derive(Clone)]
pub struct ProxyState {
    pub gateway: Arc<Gateway>,
}

#[derive(Clone)]
struct RequestTraceId(String);

const REQUEST_ID_HEADER: &str = "x-gbalance-request-id";
const SSE_KEEP_ALIVE_AFTER: Duration = Duration::from_secs(15);
const SSE_KEEP_ALIVE_FRAME: &[u8] = b": keep-alive\n\n";
const KEEP_ALIVE_BUFFER: usize = 32;

pub fn proxy_router(gateway: Arc<Gateway>) -> Router {
    let state = ProxyState { gateway };

    Router::new()
        .route("/v1/chat/completions", post(openai_chat_completions))
        .route("/openai/v1/chat/completions", post(openai_chat_completions))
        .route("/v1/models", get(openai_models_list))
        .route("/openai/v1/models", get(openai_models_list))
        .route("/v1beta/models", get(gemini_models_list))
        .route("/gemini/v1beta/models", get(gemini_models_list))
        .route("/v1beta/models/{*model_action}", post(gemini_post))
        .route("/gemini/v1beta/models/{*model_action}", post(gemini_post))
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}

/// Tags every request with a trace id, echoed back in a response header.
async fn trace_request(mut req: Request, next: Next) -> Response {
    let trace_id = uuid::Uuid::new_v4().to_string();
    tracing::debug!(
        event = "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path()
    );
    req.extensions_mut()
        .insert(RequestTraceId(trace_id.clone()));
    let mut resp = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    resp
}

async fn openai_chat_completions(
    State(state): State<ProxyState>,
    Extension(trace_id): Extension<RequestTraceId>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let call = GenerateCall {
        trace_id: trace_id.0,
        token: bearer_token(&headers),
        request: InboundRequest::OpenAI { body },
    };
    to_axum_response(state.gateway.generate(call).await)
}

async fn openai_models_list(
    State(state): State<ProxyState>,
    Extension(trace_id): Extension<RequestTraceId>,
    headers: HeaderMap,
) -> Response {
    let token = bearer_token(&headers);
    to_axum_response(
        state
            .gateway
            .list_models(&trace_id.0, token.as_ref(), InboundProtocol::OpenAI)
            .await,
    )
}

async fn gemini_models_list(
    State(state): State<ProxyState>,
    Extension(trace_id): Extension<RequestTraceId>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let token = native_token(&headers, query.as_deref());
    to_axum_response(
        state
            .gateway
            .list_models(&trace_id.0, token.as_ref(), InboundProtocol::Native)
            .await,
    )
}

async fn gemini_post(
    State(state): State<ProxyState>,
    Extension(trace_id): Extension<RequestTraceId>,
    Path(model_action): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let model_action = model_action.trim_start_matches('/');
    let Some((model, action)) = model_action.split_once(':') else {
        return error_body(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "expected models/{model}:{action}",
        );
    };
    let model = model.trim();
    if model.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", "model is required");
    }
    let stream = match action.trim() {
        "generateContent" => false,
        "streamGenerateContent" => true,
        other => {
            return error_body(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("unsupported action {other:?}"),
            );
        }
    };

    let call = GenerateCall {
        trace_id: trace_id.0,
        token: native_token(&headers, query.as_deref()),
        request: InboundRequest::Native {
            model: model.to_string(),
            stream,
            body,
        },
    };
    to_axum_response(state.gateway.generate(call).await)
}

fn to_axum_response(result: Result<GatewayResponse, gbalance_core::GatewayError>) -> Response {
    let response = match result {
        Ok(response) => response,
        Err(err) => return error_response(&err),
    };

    let mut builder = Response::builder().status(StatusCode::OK);
    let body = match response {
        GatewayResponse::Json(body) => {
            if let Some(h) = builder.headers_mut() {
                h.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
            Body::from(body)
        }
        GatewayResponse::EventStream(rx) => {
            if let Some(h) = builder.headers_mut() {
                h.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/event-stream"),
                );
                // Hint common reverse proxies to avoid buffering SSE responses.
                h.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
                h.insert(
                    HeaderName::from_static("x-accel-buffering"),
                    HeaderValue::from_static("no"),
                );
            }
            let stream = ReceiverStream::new(with_keep_alive(rx))
                .map(Ok::<_, Infallible>);
            Body::from_stream(stream)
        }
    };

    builder.body(body).unwrap_or_else(|_| {
        error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL",
            "response_build_failed",
        )
    })
}

/// Passes caller records through, adding an SSE comment frame after every
/// `SSE_KEEP_ALIVE_AFTER` of silence. Ends as soon as the response body is
/// dropped, so the gateway stream task sees its caller gone without waiting
/// for the next record.
fn with_keep_alive(mut records: mpsc::Receiver<Bytes>) -> mpsc::Receiver<Bytes> {
    let (tx, rx) = mpsc::channel::<Bytes>(KEEP_ALIVE_BUFFER);
    tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                record = records.recv() => match record {
                    Some(record) => record,
                    None => return,
                },
                _ = tokio::time::sleep(SSE_KEEP_ALIVE_AFTER) => {
                    Bytes::from_static(SSE_KEEP_ALIVE_FRAME)
                }
                _ = tx.closed() => {
                    tracing::debug!(event = "downstream_body_dropped");
                    return;
                }
            };
            if tx.send(next).await.is_err() {
                return;
            }
        }
    });
    rx
}
