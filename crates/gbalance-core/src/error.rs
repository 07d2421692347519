use gbalance_provider_core::{SelectError, UpstreamFailure};
use gbalance_transform::TranslateError;
use http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid or missing caller token")]
    Unauthenticated,
    #[error("no upstream credentials configured")]
    NoUpstreamCredentials,
    /// `status` mirrors the upstream when it answered.
    #[error("{detail}")]
    UpstreamFailure { status: Option<u16>, detail: String },
    #[error("{0}")]
    MissingContent(String),
    #[error("{0}")]
    TranscodeFailure(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GatewayError::NoUpstreamCredentials => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UpstreamFailure { status, .. } => status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            GatewayError::MissingContent(_) => StatusCode::BAD_REQUEST,
            GatewayError::TranscodeFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Upper-snake status name in the style of Google API errors.
    pub fn status_name(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "INVALID_ARGUMENT",
            StatusCode::UNAUTHORIZED => "UNAUTHENTICATED",
            StatusCode::FORBIDDEN => "PERMISSION_DENIED",
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::TOO_MANY_REQUESTS => "RESOURCE_EXHAUSTED",
            StatusCode::SERVICE_UNAVAILABLE => "UNAVAILABLE",
            StatusCode::GATEWAY_TIMEOUT => "DEADLINE_EXCEEDED",
            _ => "INTERNAL",
        }
    }
}

impl From<TranslateError> for GatewayError {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::MissingContent(message) => GatewayError::MissingContent(message),
        }
    }
}

impl From<SelectError> for GatewayError {
    fn from(err: SelectError) -> Self {
        match err {
            SelectError::NoCredentialsAvailable => GatewayError::NoUpstreamCredentials,
        }
    }
}

impl From<UpstreamFailure> for GatewayError {
    fn from(failure: UpstreamFailure) -> Self {
        GatewayError::UpstreamFailure {
            status: failure.status(),
            detail: failure.detail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn upstream_status_is_mirrored() {
        let err = GatewayError::from(UpstreamFailure::Http {
            status: 429,
            headers: Vec::new(),
            body: Bytes::from_static(br#"{"error":{"message":"quota"}}"#),
        });
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.status_name(), "RESOURCE_EXHAUSTED");
        assert_eq!(err.to_string(), "quota");
    }

    #[test]
    fn transport_failure_is_500() {
        let err = GatewayError::from(UpstreamFailure::timeout("deadline"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            GatewayError::NoUpstreamCredentials.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(GatewayError::Unauthenticated.status_name(), "UNAUTHENTICATED");
    }
}
