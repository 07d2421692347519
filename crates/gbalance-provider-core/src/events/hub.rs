use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::warn;

use super::types::RequestOutcome;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("serialize outcome: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("write outcome: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Sink(String),
}

pub trait TelemetrySink: Send + Sync {
    fn write<'a>(
        &'a self,
        outcome: &'a RequestOutcome,
    ) -> Pin<Box<dyn Future<Output = Result<(), TelemetryError>> + Send + 'a>>;
}

/// Fan-out for request outcomes. `emit` never waits on a sink: each write
/// runs in its own task and failures are only logged.
#[derive(Clone)]
pub struct TelemetryHub {
    inner: Arc<Inner>,
}

struct Inner {
    tx: broadcast::Sender<RequestOutcome>,
    sinks: RwLock<Vec<Arc<dyn TelemetrySink>>>,
}

impl TelemetryHub {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self {
            inner: Arc::new(Inner {
                tx,
                sinks: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RequestOutcome> {
        self.inner.tx.subscribe()
    }

    pub async fn add_sink(&self, sink: Arc<dyn TelemetrySink>) {
        self.inner.sinks.write().await.push(sink);
    }

    pub async fn emit(&self, outcome: RequestOutcome) {
        // No subscribers is fine.
        let _ = self.inner.tx.send(outcome.clone());
        let sinks = self.inner.sinks.read().await.clone();
        for sink in sinks {
            let outcome = outcome.clone();
            tokio::spawn(async move {
                if let Err(err) = sink.write(&outcome).await {
                    warn!(
                        event = "telemetry_write_failed",
                        trace_id = %outcome.trace_id,
                        error = %err
                    );
                }
            });
        }
    }
}

impl std::fmt::Debug for TelemetryHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryHub")
            .field("subscribers", &self.inner.tx.receiver_count())
            .finish()
    }
}
