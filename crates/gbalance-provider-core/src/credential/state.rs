use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use gbalance_common::redact_key;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// An upstream API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn redacted(&self) -> String {
        redact_key(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.redacted()).finish()
    }
}

/// Recent health of one credential.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialHealth {
    pub consecutive_failures: u32,
    pub last_failure_at: Option<OffsetDateTime>,
    pub last_used_at: Option<OffsetDateTime>,
    pub last_used_model: Option<String>,
}

impl CredentialHealth {
    /// Failures that still count at `now`: a streak whose latest failure fell
    /// out of the health window no longer counts.
    pub fn effective_failures(&self, now: OffsetDateTime, window: Duration) -> u32 {
        match self.last_failure_at {
            Some(at) if now - at <= window => self.consecutive_failures,
            Some(_) => 0,
            None => self.consecutive_failures,
        }
    }

    pub fn is_valid(&self, now: OffsetDateTime, window: Duration, max_failures: u32) -> bool {
        self.effective_failures(now, window) < max_failures
    }

    pub fn record_success(&mut self, now: OffsetDateTime, model: Option<&str>) {
        self.consecutive_failures = 0;
        self.last_failure_at = None;
        self.last_used_at = Some(now);
        if let Some(model) = model {
            self.last_used_model = Some(model.to_string());
        }
    }

    pub fn record_failure(&mut self, now: OffsetDateTime, window: Duration) {
        // A stale streak restarts instead of resuming.
        let current = self.effective_failures(now, window);
        self.consecutive_failures = current.saturating_add(1);
        self.last_failure_at = Some(now);
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.last_failure_at = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyValidity {
    Valid,
    Invalid,
}

/// Row of the key-status surface. The key is always redacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStatus {
    pub key: String,
    pub status: KeyValidity,
    pub fail_count: u32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_used_at: Option<OffsetDateTime>,
    pub last_used_model: Option<String>,
}
