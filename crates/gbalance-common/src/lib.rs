mod config;
mod parse;
mod redact;

pub use config::{
    ConfigError, ConfigPatch, DEFAULT_BASE_URL, DEFAULT_CAPABILITY_MODEL, GatewayConfig,
    ModelLists,
};
pub use parse::{parse_bool, parse_json, parse_list, parse_number, sanitize_value};
pub use redact::redact_key;
