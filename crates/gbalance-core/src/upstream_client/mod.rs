//! Outbound HTTP to the upstream API.

mod body;
mod wreq_client;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use gbalance_common::GatewayConfig;
use gbalance_provider_core::{UpstreamFailure, UpstreamHttpRequest, UpstreamHttpResponse};

pub use wreq_client::WreqUpstreamClient;

/// Sends one request to the upstream API. A non-2xx answer is still `Ok`;
/// `Err` means no usable response arrived.
pub trait UpstreamClient: Send + Sync {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>;
}

#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    pub connect_timeout: Duration,
    /// Longest gap between two body chunks of a streamed answer.
    pub stream_idle_timeout: Duration,
    pub stream_buffer: usize,
}

impl UpstreamClientConfig {
    /// Whole-request deadlines come from the gateway (`timeout_secs`); the
    /// client only bounds connecting and idle streams.
    pub fn from_gateway(config: &GatewayConfig) -> Self {
        let idle = config.timeout().min(Duration::from_secs(60));
        Self {
            stream_idle_timeout: idle.max(Duration::from_secs(1)),
            ..Self::default()
        }
    }
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            stream_idle_timeout: Duration::from_secs(60),
            stream_buffer: 16,
        }
    }
}
