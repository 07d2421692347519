use gbalance_common::GatewayConfig;
use http::HeaderMap;
use http::header::AUTHORIZATION;

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    AuthorizationBearer,
    XGoogApiKey,
    QueryKey,
}

/// A token presented by the caller, not yet checked.
#[derive(Clone, PartialEq, Eq)]
pub struct CallerToken {
    pub value: String,
    pub source: TokenSource,
}

impl std::fmt::Debug for CallerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallerToken")
            .field("value", &gbalance_common::redact_key(&self.value))
            .field("source", &self.source)
            .finish()
    }
}

/// `Authorization: Bearer <token>`; the scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<CallerToken> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let prefix = "Bearer ";
    if value.len() <= prefix.len() || !value[..prefix.len()].eq_ignore_ascii_case(prefix) {
        return None;
    }
    let token = value[prefix.len()..].trim();
    if token.is_empty() {
        return None;
    }
    Some(CallerToken {
        value: token.to_string(),
        source: TokenSource::AuthorizationBearer,
    })
}

/// Native callers may also use `x-goog-api-key` or `?key=`, in that order
/// after the bearer header.
pub fn native_token(headers: &HeaderMap, query: Option<&str>) -> Option<CallerToken> {
    if let Some(token) = bearer_token(headers) {
        return Some(token);
    }

    if let Some(value) = headers.get("x-goog-api-key")
        && let Ok(value) = value.to_str()
    {
        let value = value.trim();
        if !value.is_empty() {
            return Some(CallerToken {
                value: value.to_string(),
                source: TokenSource::XGoogApiKey,
            });
        }
    }

    let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query?).ok()?;
    pairs
        .into_iter()
        .find(|(name, _)| name == "key")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(|value| CallerToken {
            value,
            source: TokenSource::QueryKey,
        })
}

/// The token must be in the caller allow-list.
pub fn authenticate(
    config: &GatewayConfig,
    token: Option<&CallerToken>,
) -> Result<(), GatewayError> {
    match token {
        Some(token) if config.is_allowed_token(&token.value) => Ok(()),
        _ => Err(GatewayError::Unauthenticated),
    }
}

/// The admin surface accepts only the configured `auth_token`.
pub fn authorize_admin(
    config: &GatewayConfig,
    token: Option<&CallerToken>,
) -> Result<(), GatewayError> {
    match (config.auth_token.as_deref(), token) {
        (Some(expected), Some(token)) if expected == token.value => Ok(()),
        _ => Err(GatewayError::Unauthenticated),
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn config() -> GatewayConfig {
        GatewayConfig {
            allowed_tokens: vec!["sk-1".to_string()],
            auth_token: Some("admin".to_string()),
            ..GatewayConfig::default()
        }
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer  sk-1 "));
        let token = bearer_token(&headers).unwrap();
        assert_eq!(token.value, "sk-1");
        assert!(authenticate(&config(), Some(&token)).is_ok());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn native_token_sources_in_order() {
        let mut headers = HeaderMap::new();
        let from_query = native_token(&headers, Some("alt=sse&key=sk-q")).unwrap();
        assert_eq!(from_query.source, TokenSource::QueryKey);
        assert_eq!(from_query.value, "sk-q");

        headers.insert("x-goog-api-key", HeaderValue::from_static("sk-g"));
        let from_header = native_token(&headers, Some("key=sk-q")).unwrap();
        assert_eq!(from_header.source, TokenSource::XGoogApiKey);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer sk-b"));
        assert_eq!(
            native_token(&headers, Some("key=sk-q")).unwrap().source,
            TokenSource::AuthorizationBearer
        );
        assert!(native_token(&HeaderMap::new(), None).is_none());
    }

    #[test]
    fn rejects_unknown_or_missing_tokens() {
        let config = config();
        let stranger = CallerToken {
            value: "sk-2".to_string(),
            source: TokenSource::AuthorizationBearer,
        };
        assert!(matches!(
            authenticate(&config, Some(&stranger)),
            Err(GatewayError::Unauthenticated)
        ));
        assert!(authenticate(&config, None).is_err());
    }

    #[test]
    fn admin_requires_configured_token() {
        let admin = CallerToken {
            value: "admin".to_string(),
            source: TokenSource::AuthorizationBearer,
        };
        assert!(authorize_admin(&config(), Some(&admin)).is_ok());

        let unset = GatewayConfig {
            auth_token: None,
            ..config()
        };
        assert!(authorize_admin(&unset, Some(&admin)).is_err());
    }
}
