use std::collections::HashMap;
use std::time::Duration;

use gbalance_protocol::gemini::generate_content::SafetySetting;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default member of both the search and the image allow-lists.
pub const DEFAULT_CAPABILITY_MODEL: &str = "gemini-2.0-flash-exp";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_FAILURES: u32 = 5;
const DEFAULT_HEALTH_WINDOW_HOURS: u64 = 24;
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {field} value {value:?}: {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Per-suffix model allow-lists, matched against base model ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLists {
    pub search: Vec<String>,
    pub image: Vec<String>,
    pub thinking: Vec<String>,
    /// Deny-list applied to every listing.
    pub filtered: Vec<String>,
}

impl ModelLists {
    pub fn is_search(&self, model: &str) -> bool {
        self.search.iter().any(|item| item == model)
    }

    pub fn is_image(&self, model: &str) -> bool {
        self.image.iter().any(|item| item == model)
    }

    pub fn is_thinking(&self, model: &str) -> bool {
        self.thinking.iter().any(|item| item == model)
    }

    pub fn is_filtered(&self, model: &str) -> bool {
        self.filtered.iter().any(|item| item == model)
    }
}

/// Final, merged configuration used by the running gateway.
///
/// Merge order: CLI > ENV > defaults. At runtime it is replaced wholesale,
/// never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Upstream API root, without a trailing slash.
    pub base_url: String,
    /// Caller tokens accepted on the proxy routes.
    pub allowed_tokens: Vec<String>,
    /// Upstream credentials fed to the key pool.
    pub api_keys: Vec<String>,
    /// Bearer token for the admin surface; admin routes reject everything when unset.
    pub auth_token: Option<String>,
    pub models: ModelLists,
    pub thinking_budget_map: HashMap<String, i64>,
    pub max_failures: u32,
    pub health_window_hours: u64,
    pub timeout_secs: u64,
    /// Optional outbound proxy (for upstream egress).
    pub proxy: Option<String>,
    pub safety_settings: Vec<SafetySetting>,
    pub url_context_enabled: bool,
    pub code_execution_enabled: bool,
    pub show_thinking_process: bool,
}

impl GatewayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn health_window(&self) -> Duration {
        Duration::from_secs(self.health_window_hours.saturating_mul(3600))
    }

    pub fn is_allowed_token(&self, token: &str) -> bool {
        self.allowed_tokens.iter().any(|allowed| allowed == token)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let patch = ConfigPatch::default();
        patch.into_config_unchecked()
    }
}

/// Optional layer used for merging configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub base_url: Option<String>,
    pub allowed_tokens: Option<Vec<String>>,
    pub api_keys: Option<Vec<String>>,
    pub auth_token: Option<String>,
    pub search_models: Option<Vec<String>>,
    pub image_models: Option<Vec<String>>,
    pub thinking_models: Option<Vec<String>>,
    pub thinking_budget_map: Option<HashMap<String, i64>>,
    pub filtered_models: Option<Vec<String>>,
    pub max_failures: Option<u32>,
    pub health_window_hours: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub proxy: Option<String>,
    pub safety_settings: Option<Vec<SafetySetting>>,
    pub url_context_enabled: Option<bool>,
    pub code_execution_enabled: Option<bool>,
    pub show_thinking_process: Option<bool>,
}

macro_rules! overlay_fields {
    ($target:expr, $other:expr, $($field:ident),+ $(,)?) => {
        $(
            if $other.$field.is_some() {
                $target.$field = $other.$field;
            }
        )+
    };
}

impl ConfigPatch {
    pub fn overlay(&mut self, other: ConfigPatch) {
        overlay_fields!(
            self,
            other,
            host,
            port,
            base_url,
            allowed_tokens,
            api_keys,
            auth_token,
            search_models,
            image_models,
            thinking_models,
            thinking_budget_map,
            filtered_models,
            max_failures,
            health_window_hours,
            timeout_secs,
            proxy,
            safety_settings,
            url_context_enabled,
            code_execution_enabled,
            show_thinking_process,
        );
    }

    pub fn into_config(self) -> Result<GatewayConfig, ConfigError> {
        if self.max_failures == Some(0) {
            return Err(ConfigError::Zero("max_failures"));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::Zero("timeout"));
        }
        if self.health_window_hours == Some(0) {
            return Err(ConfigError::Zero("health_window_hours"));
        }
        if let Some(base_url) = self.base_url.as_deref() {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    field: "base_url",
                    value: base_url.to_string(),
                    reason: "expected an http(s) URL".to_string(),
                });
            }
        }
        Ok(self.into_config_unchecked())
    }

    fn into_config_unchecked(self) -> GatewayConfig {
        let default_capability = || vec![DEFAULT_CAPABILITY_MODEL.to_string()];
        GatewayConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            allowed_tokens: self.allowed_tokens.unwrap_or_default(),
            api_keys: dedup(self.api_keys.unwrap_or_default()),
            auth_token: self.auth_token,
            models: ModelLists {
                search: self.search_models.unwrap_or_else(default_capability),
                image: self.image_models.unwrap_or_else(default_capability),
                thinking: self.thinking_models.unwrap_or_default(),
                filtered: self.filtered_models.unwrap_or_default(),
            },
            thinking_budget_map: self.thinking_budget_map.unwrap_or_default(),
            max_failures: self.max_failures.unwrap_or(DEFAULT_MAX_FAILURES),
            health_window_hours: self
                .health_window_hours
                .unwrap_or(DEFAULT_HEALTH_WINDOW_HOURS),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            proxy: self.proxy,
            safety_settings: self.safety_settings.unwrap_or_default(),
            url_context_enabled: self.url_context_enabled.unwrap_or(false),
            code_execution_enabled: self.code_execution_enabled.unwrap_or(false),
            show_thinking_process: self.show_thinking_process.unwrap_or(true),
        }
    }
}

impl From<GatewayConfig> for ConfigPatch {
    fn from(value: GatewayConfig) -> Self {
        Self {
            host: Some(value.host),
            port: Some(value.port),
            base_url: Some(value.base_url),
            allowed_tokens: Some(value.allowed_tokens),
            api_keys: Some(value.api_keys),
            auth_token: value.auth_token,
            search_models: Some(value.models.search),
            image_models: Some(value.models.image),
            thinking_models: Some(value.models.thinking),
            thinking_budget_map: Some(value.thinking_budget_map),
            filtered_models: Some(value.models.filtered),
            max_failures: Some(value.max_failures),
            health_window_hours: Some(value.health_window_hours),
            timeout_secs: Some(value.timeout_secs),
            proxy: value.proxy,
            safety_settings: Some(value.safety_settings),
            url_context_enabled: Some(value.url_context_enabled),
            code_execution_enabled: Some(value.code_execution_enabled),
            show_thinking_process: Some(value.show_thinking_process),
        }
    }
}

// Duplicate keys would get two rotation slots.
fn dedup(keys: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keys.len());
    for key in keys {
        if !out.contains(&key) {
            out.push(key);
        }
    }
    out
}
