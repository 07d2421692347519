use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use wreq::{Client, Method, Proxy};

use gbalance_provider_core::{
    HttpMethod, UpstreamFailure, UpstreamHttpRequest, UpstreamHttpResponse,
    UpstreamTransportErrorKind,
};

use super::body::{classify, read_response};
use super::{UpstreamClient, UpstreamClientConfig};

type ProxyResolver = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// `UpstreamClient` over wreq. One pooled client is kept per outbound proxy,
/// and the proxy is looked up again for every request, so a configuration
/// swap that changes it applies to the next call.
#[derive(Clone)]
pub struct WreqUpstreamClient {
    config: UpstreamClientConfig,
    resolve_proxy: ProxyResolver,
    direct: Client,
    proxied: Arc<Mutex<HashMap<String, Client>>>,
}

impl WreqUpstreamClient {
    pub fn new_with_proxy_resolver<F>(
        config: UpstreamClientConfig,
        resolve_proxy: F,
    ) -> Result<Self, wreq::Error>
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        let direct = build_client(&config, None)?;
        Ok(Self {
            config,
            resolve_proxy: Arc::new(resolve_proxy),
            direct,
            proxied: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn client(&self) -> Result<Client, UpstreamFailure> {
        let Some(proxy) = non_blank((self.resolve_proxy)()) else {
            return Ok(self.direct.clone());
        };
        let mut cache = self.proxied.lock().map_err(|_| UpstreamFailure::Transport {
            kind: UpstreamTransportErrorKind::Other,
            message: "proxy client cache poisoned".to_string(),
        })?;
        if let Some(client) = cache.get(&proxy) {
            return Ok(client.clone());
        }
        let client = build_client(&self.config, Some(&proxy)).map_err(classify)?;
        tracing::info!(event = "upstream_proxy_client_built", proxy = %proxy);
        cache.insert(proxy, client.clone());
        Ok(client)
    }
}

impl std::fmt::Debug for WreqUpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WreqUpstreamClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl UpstreamClient for WreqUpstreamClient {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>
    {
        Box::pin(async move {
            let client = self.client()?;
            let method = match req.method {
                HttpMethod::Get => Method::GET,
                HttpMethod::Post => Method::POST,
            };
            let mut builder = req
                .headers
                .iter()
                .fold(client.request(method, &req.url), |builder, (name, value)| {
                    builder.header(name, value)
                });
            if let Some(body) = req.body {
                builder = builder.body(body);
            }

            let resp = builder.send().await.map_err(classify)?;
            read_response(resp, req.is_stream, &self.config).await
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn build_client(config: &UpstreamClientConfig, proxy: Option<&str>) -> Result<Client, wreq::Error> {
    let builder = Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.stream_idle_timeout);
    match proxy {
        Some(proxy) => builder.proxy(Proxy::all(proxy)?).build(),
        None => builder.build(),
    }
}
