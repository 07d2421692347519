use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use gbalance_provider_core::{RequestOutcome, TelemetryError, TelemetryHub, TelemetrySink};
use time::OffsetDateTime;
use tokio::sync::mpsc;

struct ChannelSink(mpsc::UnboundedSender<RequestOutcome>);

impl TelemetrySink for ChannelSink {
    fn write<'a>(
        &'a self,
        outcome: &'a RequestOutcome,
    ) -> Pin<Box<dyn Future<Output = Result<(), TelemetryError>> + Send + 'a>> {
        Box::pin(async move {
            self.0
                .send(outcome.clone())
                .map_err(|err| TelemetryError::Sink(err.to_string()))
        })
    }
}

struct BrokenSink;

impl TelemetrySink for BrokenSink {
    fn write<'a>(
        &'a self,
        _outcome: &'a RequestOutcome,
    ) -> Pin<Box<dyn Future<Output = Result<(), TelemetryError>> + Send + 'a>> {
        Box::pin(async { Err(TelemetryError::Sink("disk full".to_string())) })
    }
}

fn outcome(trace_id: &str) -> RequestOutcome {
    RequestOutcome {
        trace_id: trace_id.to_string(),
        at: OffsetDateTime::now_utc(),
        credential: Some("AIzaSy...defXYZ".to_string()),
        model: "gemini-1.5-flash".to_string(),
        success: true,
        http_status: 200,
        latency_ms: 12,
        error_detail: None,
        is_stream: false,
    }
}

#[tokio::test]
async fn broken_sink_does_not_block_others() {
    let hub = TelemetryHub::new(16);
    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.add_sink(Arc::new(BrokenSink)).await;
    hub.add_sink(Arc::new(ChannelSink(tx))).await;

    hub.emit(outcome("t-1")).await;

    let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received.trace_id, "t-1");
}

#[tokio::test]
async fn subscribers_see_every_outcome() {
    let hub = TelemetryHub::new(16);
    let mut rx = hub.subscribe();
    hub.emit(outcome("a")).await;
    hub.emit(outcome("b")).await;
    assert_eq!(rx.recv().await.unwrap().trace_id, "a");
    assert_eq!(rx.recv().await.unwrap().trace_id, "b");
}

#[test]
fn outcome_serializes_timestamp_as_rfc3339() {
    let value = serde_json::to_value(outcome("x")).unwrap();
    assert!(value["at"].as_str().unwrap().contains('T'));
    assert_eq!(value["credential"], "AIzaSy...defXYZ");
}
