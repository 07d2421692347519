//! HTTP surface of the gateway: both inbound protocol families and the
//! key-status admin routes.

pub mod admin;
pub mod error;
pub mod proxy;

use std::sync::Arc;

use axum::Router;
use gbalance_core::Gateway;

pub use admin::admin_router;
pub use proxy::proxy_router;

/// Proxy routes at the root, admin routes under `/admin`.
pub fn app_router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .merge(proxy_router(gateway.clone()))
        .nest("/admin", admin_router(gateway))
}
