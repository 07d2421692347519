use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use gbalance_common::{
    ConfigPatch, GatewayConfig, parse_bool, parse_json, parse_list, parse_number, sanitize_value,
};
use gbalance_protocol::gemini::generate_content::SafetySetting;
use gbalance_provider_core::{TelemetryHub, TerminalTelemetrySink};

use crate::gateway::Gateway;
use crate::state::ConfigHandle;
use crate::upstream_client::{UpstreamClientConfig, WreqUpstreamClient};

const TELEMETRY_BUFFER: usize = 1024;

/// Every value is taken raw so blank values and `${VAR}` placeholders can be
/// treated as unset before parsing.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "gbalance",
    version,
    about = "Load-balancing gateway for the Gemini API with an OpenAI-compatible surface"
)]
pub struct CliArgs {
    /// Bind host.
    #[arg(long, env = "GBALANCE_HOST")]
    pub host: Option<String>,

    /// Bind port.
    #[arg(long, env = "GBALANCE_PORT")]
    pub port: Option<String>,

    /// Upstream API root.
    #[arg(long, env = "GBALANCE_BASE_URL")]
    pub base_url: Option<String>,

    /// Caller tokens accepted on the proxy routes (JSON array or comma list).
    #[arg(long, env = "GBALANCE_ALLOWED_TOKENS")]
    pub allowed_tokens: Option<String>,

    /// Upstream API keys (JSON array or comma list).
    #[arg(long, env = "GBALANCE_API_KEYS")]
    pub api_keys: Option<String>,

    /// Bearer token for the admin routes.
    #[arg(long, env = "GBALANCE_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    #[arg(long, env = "GBALANCE_SEARCH_MODELS")]
    pub search_models: Option<String>,

    #[arg(long, env = "GBALANCE_IMAGE_MODELS")]
    pub image_models: Option<String>,

    #[arg(long, env = "GBALANCE_THINKING_MODELS")]
    pub thinking_models: Option<String>,

    /// JSON object of model id to thinking budget.
    #[arg(long, env = "GBALANCE_THINKING_BUDGET_MAP")]
    pub thinking_budget_map: Option<String>,

    /// Models hidden from every listing.
    #[arg(long, env = "GBALANCE_FILTERED_MODELS")]
    pub filtered_models: Option<String>,

    /// Consecutive failures before a key leaves rotation.
    #[arg(long, env = "GBALANCE_MAX_FAILURES")]
    pub max_failures: Option<String>,

    /// Failures older than this many hours are forgotten.
    #[arg(long, env = "GBALANCE_HEALTH_WINDOW_HOURS")]
    pub health_window_hours: Option<String>,

    /// Upstream request timeout in seconds.
    #[arg(long, env = "GBALANCE_TIMEOUT")]
    pub timeout: Option<String>,

    /// Optional outbound proxy for upstream requests.
    #[arg(long, env = "GBALANCE_PROXY")]
    pub proxy: Option<String>,

    /// JSON array of `{category, threshold}`.
    #[arg(long, env = "GBALANCE_SAFETY_SETTINGS")]
    pub safety_settings: Option<String>,

    #[arg(long, env = "GBALANCE_URL_CONTEXT_ENABLED")]
    pub url_context_enabled: Option<String>,

    #[arg(long, env = "GBALANCE_CODE_EXECUTION_ENABLED")]
    pub code_execution_enabled: Option<String>,

    #[arg(long, env = "GBALANCE_SHOW_THINKING_PROCESS")]
    pub show_thinking_process: Option<String>,
}

impl CliArgs {
    /// clap already applies CLI > ENV per field; this only parses.
    pub fn into_patch(self) -> anyhow::Result<ConfigPatch> {
        Ok(ConfigPatch {
            host: sanitize_value(self.host),
            port: parse_number(self.port, "GBALANCE_PORT")?,
            base_url: sanitize_value(self.base_url),
            allowed_tokens: parse_list(self.allowed_tokens, "GBALANCE_ALLOWED_TOKENS")?,
            api_keys: parse_list(self.api_keys, "GBALANCE_API_KEYS")?,
            auth_token: sanitize_value(self.auth_token),
            search_models: parse_list(self.search_models, "GBALANCE_SEARCH_MODELS")?,
            image_models: parse_list(self.image_models, "GBALANCE_IMAGE_MODELS")?,
            thinking_models: parse_list(self.thinking_models, "GBALANCE_THINKING_MODELS")?,
            thinking_budget_map: parse_json::<HashMap<String, i64>>(
                self.thinking_budget_map,
                "GBALANCE_THINKING_BUDGET_MAP",
            )?,
            filtered_models: parse_list(self.filtered_models, "GBALANCE_FILTERED_MODELS")?,
            max_failures: parse_number(self.max_failures, "GBALANCE_MAX_FAILURES")?,
            health_window_hours: parse_number(
                self.health_window_hours,
                "GBALANCE_HEALTH_WINDOW_HOURS",
            )?,
            timeout_secs: parse_number(self.timeout, "GBALANCE_TIMEOUT")?,
            proxy: sanitize_value(self.proxy),
            safety_settings: parse_json::<Vec<SafetySetting>>(
                self.safety_settings,
                "GBALANCE_SAFETY_SETTINGS",
            )?,
            url_context_enabled: parse_bool(
                self.url_context_enabled,
                "GBALANCE_URL_CONTEXT_ENABLED",
            )?,
            code_execution_enabled: parse_bool(
                self.code_execution_enabled,
                "GBALANCE_CODE_EXECUTION_ENABLED",
            )?,
            show_thinking_process: parse_bool(
                self.show_thinking_process,
                "GBALANCE_SHOW_THINKING_PROCESS",
            )?,
        })
    }
}

pub struct Bootstrap {
    pub config: Arc<ConfigHandle>,
    pub gateway: Arc<Gateway>,
}

pub async fn bootstrap_from_env() -> anyhow::Result<Bootstrap> {
    let args = CliArgs::parse();
    bootstrap(args).await
}

pub async fn bootstrap(args: CliArgs) -> anyhow::Result<Bootstrap> {
    let patch = args.into_patch().context("parse CLI/ENV settings")?;
    let config: GatewayConfig = patch.into_config().context("finalize gateway config")?;

    if config.allowed_tokens.is_empty() {
        tracing::warn!(
            event = "no_allowed_tokens",
            "GBALANCE_ALLOWED_TOKENS is empty; every proxy request will be rejected"
        );
    }
    if config.api_keys.is_empty() {
        tracing::warn!(
            event = "no_api_keys",
            "GBALANCE_API_KEYS is empty; generate requests will fail with 503"
        );
    }

    let client_config = UpstreamClientConfig::from_gateway(&config);
    let handle = Arc::new(ConfigHandle::new(config));

    let resolver_handle = handle.clone();
    let client = WreqUpstreamClient::new_with_proxy_resolver(client_config, move || {
        resolver_handle.proxy()
    })
    .context("build upstream client")?;

    let telemetry = TelemetryHub::new(TELEMETRY_BUFFER);
    telemetry
        .add_sink(Arc::new(TerminalTelemetrySink::new()))
        .await;

    let gateway = Gateway::new(handle.clone(), Arc::new(client), telemetry);
    Ok(Bootstrap {
        config: handle,
        gateway: Arc::new(gateway),
    })
}
