//! Clustermgr Solace Provider
//!
//! Event-broker lifecycle against the mission-control management API:
//! asynchronous create with polling until the service settles, drift-aware
//! reads, in-place rename and idempotent delete.
//!
//! ## Module Structure
//!
//! - `client` - authenticated transport to the management API
//! - `config` - host-supplied provider configuration
//! - `naming` - router-name derivation rules
//! - `provider` - SolaceProvider lifecycle controller
//! - `wire` - wire model and mapping to the canonical record

pub mod client;
pub mod config;
pub mod naming;
pub mod provider;
pub mod wire;

// Re-export main types
pub use config::ProviderConfig;
pub use naming::router_prefix;
pub use provider::SolaceProvider;

use clustermgr_core::provider::{BoxFuture, Provider, ProviderResult};
use clustermgr_core::resource::{BrokerRecord, BrokerSpec, BrokerState};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for SolaceProvider {
    fn name(&self) -> &'static str {
        "solace"
    }

    fn create(&self, spec: &BrokerSpec) -> BoxFuture<'_, ProviderResult<BrokerRecord>> {
        let spec = spec.clone();
        Box::pin(async move { self.create_broker(&spec).await })
    }

    fn read(&self, id: &str) -> BoxFuture<'_, ProviderResult<BrokerState>> {
        let id = id.to_string();
        Box::pin(async move { self.read_broker(&id).await })
    }

    fn update(&self, id: &str, name: &str) -> BoxFuture<'_, ProviderResult<BrokerRecord>> {
        let id = id.to_string();
        let name = name.to_string();
        Box::pin(async move { self.update_broker(&id, &name).await })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.to_string();
        Box::pin(async move { self.delete_broker(&id).await })
    }

    fn lookup(&self, id: &str) -> BoxFuture<'_, ProviderResult<BrokerRecord>> {
        let id = id.to_string();
        Box::pin(async move { self.lookup_broker(&id).await })
    }
}
