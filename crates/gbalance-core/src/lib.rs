pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod gateway;
pub mod state;
pub mod upstream_client;

pub use auth::{CallerToken, TokenSource};
pub use error::GatewayError;
pub use gateway::{Gateway, GatewayResponse, GenerateCall, InboundProtocol, InboundRequest, Stage};
pub use state::ConfigHandle;
pub use upstream_client::{UpstreamClient, UpstreamClientConfig, WreqUpstreamClient};
