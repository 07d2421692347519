use bytes::Bytes;

/// Header name/value pairs in arrival order.
pub type Headers = Vec<(String, String)>;

/// Body chunks of a streaming upstream response.
///
/// The pump task ends the channel cleanly when the upstream finishes and sends
/// one `Err` before closing when the transport fails mid-stream, so consumers
/// can tell a complete stream from a truncated one.
pub type ByteStream = tokio::sync::mpsc::Receiver<Result<Bytes, UpstreamFailure>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

#[derive(Debug)]
pub enum UpstreamBody {
    Bytes(Bytes),
    Stream(ByteStream),
}

#[derive(Debug)]
pub struct UpstreamHttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: UpstreamBody,
}

impl UpstreamHttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamHttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
    pub is_stream: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UpstreamTransportErrorKind {
    Timeout,
    ReadTimeout,
    Connect,
    Dns,
    Tls,
    Other,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamFailure {
    /// Transport-level failures (no HTTP response).
    #[error("upstream transport error ({kind:?}): {message}")]
    Transport {
        kind: UpstreamTransportErrorKind,
        message: String,
    },
    /// HTTP error response captured as bytes (non-2xx).
    #[error("upstream returned status {status}")]
    Http {
        status: u16,
        headers: Headers,
        body: Bytes,
    },
}

impl UpstreamFailure {
    pub fn timeout(message: impl Into<String>) -> Self {
        UpstreamFailure::Transport {
            kind: UpstreamTransportErrorKind::Timeout,
            message: message.into(),
        }
    }

    /// The upstream status, when the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamFailure::Http { status, .. } => Some(*status),
            UpstreamFailure::Transport { .. } => None,
        }
    }

    /// Human-readable detail: the upstream error message when its body carries
    /// one, else the body text or the transport message.
    pub fn detail(&self) -> String {
        match self {
            UpstreamFailure::Transport { message, .. } => message.clone(),
            UpstreamFailure::Http { status, body, .. } => {
                if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
                    if let Some(message) = value
                        .pointer("/error/message")
                        .and_then(serde_json::Value::as_str)
                    {
                        return message.to_string();
                    }
                }
                let text = String::from_utf8_lossy(body);
                let text = text.trim();
                if text.is_empty() {
                    format!("upstream returned status {status}")
                } else {
                    text.to_string()
                }
            }
        }
    }
}

/// `{base}/models/{model}:generateContent?key=...`, or the SSE streaming
/// variant `:streamGenerateContent?alt=sse&key=...`.
pub fn generate_content_url(
    base_url: &str,
    model: &str,
    key: &str,
    stream: bool,
) -> Result<String, serde_urlencoded::ser::Error> {
    let base_url = base_url.trim_end_matches('/');
    if stream {
        let query = serde_urlencoded::to_string([("alt", "sse"), ("key", key)])?;
        Ok(format!(
            "{base_url}/models/{model}:streamGenerateContent?{query}"
        ))
    } else {
        let query = serde_urlencoded::to_string([("key", key)])?;
        Ok(format!("{base_url}/models/{model}:generateContent?{query}"))
    }
}

/// `{base}/models?key=...&pageSize=1000`.
pub fn list_models_url(base_url: &str, key: &str) -> Result<String, serde_urlencoded::ser::Error> {
    let base_url = base_url.trim_end_matches('/');
    let query = serde_urlencoded::to_string([("key", key), ("pageSize", "1000")])?;
    Ok(format!("{base_url}/models?{query}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls() {
        let base = "https://generativelanguage.googleapis.com/v1beta/";
        assert_eq!(
            generate_content_url(base, "gemini-1.5-flash", "k+1", false).unwrap(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent?key=k%2B1"
        );
        assert_eq!(
            generate_content_url(base, "gemini-1.5-flash", "k", true).unwrap(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:streamGenerateContent?alt=sse&key=k"
        );
        assert_eq!(
            list_models_url(base, "k").unwrap(),
            "https://generativelanguage.googleapis.com/v1beta/models?key=k&pageSize=1000"
        );
    }

    #[test]
    fn failure_detail_prefers_upstream_message() {
        let failure = UpstreamFailure::Http {
            status: 429,
            headers: Headers::new(),
            body: Bytes::from_static(br#"{"error":{"code":429,"message":"quota exhausted"}}"#),
        };
        assert_eq!(failure.status(), Some(429));
        assert_eq!(failure.detail(), "quota exhausted");

        let bare = UpstreamFailure::Http {
            status: 502,
            headers: Headers::new(),
            body: Bytes::new(),
        };
        assert_eq!(bare.detail(), "upstream returned status 502");
        assert_eq!(UpstreamFailure::timeout("slow").status(), None);
    }
}
