use std::time::Instant;

use gbalance_provider_core::{Credential, RequestOutcome};
use time::OffsetDateTime;
use tracing::debug;

use super::Stage;

/// What is known about one generate request so far.
#[derive(Debug, Clone)]
pub(super) struct RequestContext {
    pub trace_id: String,
    pub started_at: Instant,
    pub stage: Stage,
    pub model: String,
    pub credential: Option<Credential>,
    pub is_stream: bool,
}

impl RequestContext {
    pub fn new(trace_id: String) -> Self {
        Self {
            trace_id,
            started_at: Instant::now(),
            stage: Stage::Authenticating,
            model: String::new(),
            credential: None,
            is_stream: false,
        }
    }

    pub fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        debug!(
            event = "request_stage",
            trace_id = %self.trace_id,
            stage = stage.as_str()
        );
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn outcome(
        &self,
        success: bool,
        http_status: u16,
        error_detail: Option<String>,
    ) -> RequestOutcome {
        RequestOutcome {
            trace_id: self.trace_id.clone(),
            at: OffsetDateTime::now_utc(),
            credential: self.credential.as_ref().map(Credential::redacted),
            model: self.model.clone(),
            success,
            http_status,
            latency_ms: self.elapsed_ms(),
            error_detail,
            is_stream: self.is_stream,
        }
    }
}
