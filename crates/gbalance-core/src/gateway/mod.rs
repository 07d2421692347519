//! Per-request orchestration.
//!
//! A generate request walks the [`Stage`]s in order: the caller token is
//! checked, the model id is decoded, a key is taken from the pool, the body is
//! translated to the canonical shape, one upstream call is made and the answer
//! is translated back. Every generate request produces exactly one
//! `RequestOutcome`, whichever way it ends.

mod context;
mod generate;
mod models;
mod stage;
mod types;

use std::sync::Arc;

use bytes::Bytes;
use gbalance_common::GatewayConfig;
use gbalance_provider_core::{
    KeyPool, KeyStatus, TelemetryHub, UpstreamBody, UpstreamFailure, UpstreamHttpRequest,
    UpstreamHttpResponse,
};
use tracing::info;

use crate::auth::{CallerToken, authorize_admin};
use crate::error::GatewayError;
use crate::state::ConfigHandle;
use crate::upstream_client::UpstreamClient;

pub use stage::Stage;
pub use types::{GatewayResponse, GenerateCall, InboundProtocol, InboundRequest};

pub struct Gateway {
    config: Arc<ConfigHandle>,
    pool: KeyPool,
    client: Arc<dyn UpstreamClient>,
    telemetry: TelemetryHub,
}

impl Gateway {
    pub fn new(
        config: Arc<ConfigHandle>,
        client: Arc<dyn UpstreamClient>,
        telemetry: TelemetryHub,
    ) -> Self {
        let snapshot = config.load();
        let pool = KeyPool::new(
            &snapshot.api_keys,
            snapshot.max_failures,
            snapshot.health_window(),
        );
        Self {
            config,
            pool,
            client,
            telemetry,
        }
    }

    pub fn config(&self) -> Arc<GatewayConfig> {
        self.config.load()
    }

    pub fn pool(&self) -> &KeyPool {
        &self.pool
    }

    pub fn telemetry(&self) -> &TelemetryHub {
        &self.telemetry
    }

    /// Swap in a new configuration. Requests already running keep the
    /// snapshot they started with; retained keys keep their health.
    pub async fn apply_config(&self, config: GatewayConfig) {
        self.pool.sync_credentials(&config.api_keys).await;
        self.pool
            .set_policy(config.max_failures, config.health_window())
            .await;
        info!(
            event = "config_applied",
            keys = config.api_keys.len(),
            allowed_tokens = config.allowed_tokens.len(),
            max_failures = config.max_failures
        );
        self.config.store(config);
    }

    pub async fn key_statuses(
        &self,
        token: Option<&CallerToken>,
    ) -> Result<Vec<KeyStatus>, GatewayError> {
        authorize_admin(&self.config.load(), token)?;
        Ok(self.pool.statuses().await)
    }

    /// Returns whether the key is configured.
    pub async fn reset_key(
        &self,
        token: Option<&CallerToken>,
        key: &str,
    ) -> Result<bool, GatewayError> {
        authorize_admin(&self.config.load(), token)?;
        let found = self.pool.reset(key).await;
        info!(
            event = "key_reset",
            key = %gbalance_common::redact_key(key),
            found
        );
        Ok(found)
    }

    pub async fn reset_all_keys(&self, token: Option<&CallerToken>) -> Result<(), GatewayError> {
        authorize_admin(&self.config.load(), token)?;
        self.pool.reset_all().await;
        info!(event = "keys_reset_all");
        Ok(())
    }

    /// One upstream attempt bounded by the configured timeout. A non-2xx
    /// answer becomes `UpstreamFailure::Http`.
    async fn call_upstream(
        &self,
        config: &GatewayConfig,
        request: UpstreamHttpRequest,
    ) -> Result<UpstreamHttpResponse, UpstreamFailure> {
        let timeout = config.timeout();
        let response = tokio::time::timeout(timeout, self.client.send(request))
            .await
            .map_err(|_| {
                UpstreamFailure::timeout(format!(
                    "upstream did not respond within {}s",
                    timeout.as_secs()
                ))
            })??;

        if response.is_success() {
            return Ok(response);
        }
        let body = match response.body {
            UpstreamBody::Bytes(body) => body,
            UpstreamBody::Stream(_) => Bytes::new(),
        };
        Err(UpstreamFailure::Http {
            status: response.status,
            headers: response.headers,
            body,
        })
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}
