use bytes::Bytes;
use tokio::sync::mpsc;

use crate::auth::CallerToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundProtocol {
    Native,
    OpenAI,
}

/// A generate request as it arrived, body still undecoded.
#[derive(Debug, Clone)]
pub enum InboundRequest {
    /// Model and streaming come from the route path.
    Native {
        model: String,
        stream: bool,
        body: Bytes,
    },
    /// Model and streaming are named in the body.
    OpenAI { body: Bytes },
}

impl InboundRequest {
    pub fn protocol(&self) -> InboundProtocol {
        match self {
            InboundRequest::Native { .. } => InboundProtocol::Native,
            InboundRequest::OpenAI { .. } => InboundProtocol::OpenAI,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub trace_id: String,
    pub token: Option<CallerToken>,
    pub request: InboundRequest,
}

#[derive(Debug)]
pub enum GatewayResponse {
    /// A complete JSON body.
    Json(Bytes),
    /// Caller-framed SSE records. Dropping the receiver cancels the upstream.
    EventStream(mpsc::Receiver<Bytes>),
}
