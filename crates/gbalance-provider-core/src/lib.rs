//! Provider-side state for the gateway.
//!
//! This crate intentionally does **not** depend on axum or any concrete HTTP client.
//! The gateway builds `UpstreamHttpRequest`s from here while a higher layer performs IO.

pub mod credential;
pub mod events;
pub mod upstream;

pub use credential::{Credential, CredentialHealth, KeyPool, KeyStatus, KeyValidity, SelectError};
pub use events::{
    RequestOutcome, TelemetryError, TelemetryHub, TelemetrySink, TerminalTelemetrySink,
};
pub use upstream::{
    ByteStream, Headers, HttpMethod, UpstreamBody, UpstreamFailure, UpstreamHttpRequest,
    UpstreamHttpResponse, UpstreamTransportErrorKind, generate_content_url, list_models_url,
};
