use std::time::Instant;

use bytes::Bytes;
use gbalance_protocol::gemini::list_models::ListModelsResponse;
use gbalance_provider_core::{HttpMethod, UpstreamHttpRequest, list_models_url};
use gbalance_transform::{ModelResolver, native_listing, openai_listing};
use tracing::{info, warn};

use super::generate::collect_body;
use super::{Gateway, GatewayResponse, InboundProtocol};
use crate::auth::{CallerToken, authenticate};
use crate::error::GatewayError;

impl Gateway {
    /// Upstream model listing rewritten for the caller's protocol, with
    /// filtered models removed and capability variants added.
    pub async fn list_models(
        &self,
        trace_id: &str,
        token: Option<&CallerToken>,
        protocol: InboundProtocol,
    ) -> Result<GatewayResponse, GatewayError> {
        let started_at = Instant::now();
        let result = self.fetch_listing(token, protocol).await;
        let elapsed_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) => info!(
                event = "models_listed",
                trace_id = %trace_id,
                protocol = ?protocol,
                elapsed_ms
            ),
            Err(err) => warn!(
                event = "models_list_failed",
                trace_id = %trace_id,
                protocol = ?protocol,
                status = err.status().as_u16(),
                error = %err,
                elapsed_ms
            ),
        }
        result
    }

    async fn fetch_listing(
        &self,
        token: Option<&CallerToken>,
        protocol: InboundProtocol,
    ) -> Result<GatewayResponse, GatewayError> {
        let config = self.config.load();
        authenticate(&config, token)?;

        let credential = self.pool.select().await?;
        let url = list_models_url(&config.base_url, credential.value())
            .map_err(|err| GatewayError::TranscodeFailure(err.to_string()))?;
        let request = UpstreamHttpRequest {
            method: HttpMethod::Get,
            url,
            headers: Vec::new(),
            body: None,
            is_stream: false,
        };

        let response = match self.call_upstream(&config, request).await {
            Ok(response) => response,
            Err(failure) => {
                self.pool.record_outcome(&credential, false, None).await;
                return Err(failure.into());
            }
        };
        self.pool.record_outcome(&credential, true, None).await;

        let body = collect_body(response.body).await?;
        let upstream: ListModelsResponse = serde_json::from_slice(&body).map_err(|err| {
            GatewayError::TranscodeFailure(format!("invalid upstream model listing: {err}"))
        })?;

        let resolver = ModelResolver::new(&config);
        let encoded = match protocol {
            InboundProtocol::Native => serde_json::to_vec(&native_listing(&resolver, upstream)),
            InboundProtocol::OpenAI => serde_json::to_vec(&openai_listing(&resolver, &upstream)),
        }
        .map_err(|err| GatewayError::TranscodeFailure(err.to_string()))?;
        Ok(GatewayResponse::Json(Bytes::from(encoded)))
    }
}
