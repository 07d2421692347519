use std::sync::Arc;

use arc_swap::ArcSwap;
use gbalance_common::GatewayConfig;

/// The running configuration. Readers take a snapshot per request; updates
/// replace it whole.
#[derive(Debug)]
pub struct ConfigHandle {
    current: ArcSwap<GatewayConfig>,
}

impl ConfigHandle {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    pub fn load(&self) -> Arc<GatewayConfig> {
        self.current.load_full()
    }

    pub fn store(&self, config: GatewayConfig) {
        self.current.store(Arc::new(config));
    }

    /// Outbound proxy of the current snapshot.
    pub fn proxy(&self) -> Option<String> {
        self.current.load().proxy.clone()
    }
}
