use std::str::FromStr;

use serde::de::DeserializeOwned;

use crate::ConfigError;

/// Trims a raw CLI/ENV value; empty strings and unresolved `${VAR}`
/// placeholders (some PaaS inject them verbatim) count as unset.
pub fn sanitize_value(value: Option<String>) -> Option<String> {
    let trimmed = value?.trim().to_string();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("${") && trimmed.ends_with('}') {
        return None;
    }
    Some(trimmed)
}

/// Parses a list given either as a JSON array of strings or as a
/// comma-separated list. Blank items are skipped.
pub fn parse_list(
    value: Option<String>,
    field: &'static str,
) -> Result<Option<Vec<String>>, ConfigError> {
    let Some(raw) = sanitize_value(value) else {
        return Ok(None);
    };
    if raw.starts_with('[') {
        let items: Vec<String> =
            serde_json::from_str(&raw).map_err(|err| ConfigError::Invalid {
                field,
                value: raw.clone(),
                reason: err.to_string(),
            })?;
        return Ok(Some(
            items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        ));
    }
    Ok(Some(
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    ))
}

/// Parses a JSON-encoded setting (maps, arrays of objects).
pub fn parse_json<T: DeserializeOwned>(
    value: Option<String>,
    field: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = sanitize_value(value) else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|err| ConfigError::Invalid {
            field,
            value: raw,
            reason: err.to_string(),
        })
}

pub fn parse_number<T>(value: Option<String>, field: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = sanitize_value(value) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|err| ConfigError::Invalid {
            field,
            value: raw,
            reason: err.to_string(),
        })
}

pub fn parse_bool(value: Option<String>, field: &'static str) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = sanitize_value(value) else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid {
            field,
            value: raw,
            reason: "expected a boolean".to_string(),
        }),
    }
}
