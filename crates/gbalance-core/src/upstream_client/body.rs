use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use gbalance_provider_core::{
    Headers, UpstreamBody, UpstreamFailure, UpstreamHttpResponse, UpstreamTransportErrorKind,
};

use super::UpstreamClientConfig;

/// Error bodies and non-streaming answers are read whole. A successful
/// streaming answer is handed over as a channel fed by a pump task.
pub(super) async fn read_response(
    resp: wreq::Response,
    want_stream: bool,
    config: &UpstreamClientConfig,
) -> Result<UpstreamHttpResponse, UpstreamFailure> {
    let status = resp.status().as_u16();
    let headers: Headers = resp
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    let body = if want_stream && (200..300).contains(&status) {
        let (tx, rx) = mpsc::channel(config.stream_buffer);
        tokio::spawn(pump(resp.bytes_stream(), tx, config.stream_idle_timeout));
        UpstreamBody::Stream(rx)
    } else {
        UpstreamBody::Bytes(resp.bytes().await.map_err(classify)?)
    };

    Ok(UpstreamHttpResponse {
        status,
        headers,
        body,
    })
}

/// Forwards chunks until the upstream ends. A transport error or an idle gap
/// is sent as one final `Err`. Stops as soon as the receiver is gone, which
/// drops the upstream response.
async fn pump<S>(stream: S, tx: mpsc::Sender<Result<Bytes, UpstreamFailure>>, idle: Duration)
where
    S: Stream<Item = Result<Bytes, wreq::Error>>,
{
    let mut stream = std::pin::pin!(stream);
    loop {
        let item = match tokio::time::timeout(idle, stream.next()).await {
            Ok(Some(Ok(chunk))) => Ok(chunk),
            Ok(Some(Err(err))) => Err(classify(err)),
            Ok(None) => return,
            Err(_) => Err(UpstreamFailure::Transport {
                kind: UpstreamTransportErrorKind::ReadTimeout,
                message: format!("upstream sent nothing for {}s", idle.as_secs()),
            }),
        };
        let last = item.is_err();
        if tx.send(item).await.is_err() {
            debug!(event = "upstream_stream_dropped", "downstream receiver closed");
            return;
        }
        if last {
            return;
        }
    }
}

pub(super) fn classify(err: wreq::Error) -> UpstreamFailure {
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

    let kind = if err.is_timeout() {
        if mentions(&["read", "idle"]) {
            UpstreamTransportErrorKind::ReadTimeout
        } else {
            UpstreamTransportErrorKind::Timeout
        }
    } else if mentions(&["tls", "ssl", "certificate"]) {
        UpstreamTransportErrorKind::Tls
    } else if err.is_connect() && mentions(&["dns", "resolve"]) {
        UpstreamTransportErrorKind::Dns
    } else if err.is_connect() || err.is_connection_reset() {
        UpstreamTransportErrorKind::Connect
    } else {
        UpstreamTransportErrorKind::Other
    };
    UpstreamFailure::Transport { kind, message }
}
