use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One record per inbound generate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub trace_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    /// Redacted; absent when the request failed before a key was selected.
    pub credential: Option<String>,
    pub model: String,
    pub success: bool,
    pub http_status: u16,
    pub latency_ms: u64,
    pub error_detail: Option<String>,
    pub is_stream: bool,
}
