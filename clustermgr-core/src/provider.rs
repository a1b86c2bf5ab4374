//! Provider - trait abstracting broker lifecycle operations
//!
//! A Provider maps declarative broker configuration to lifecycle calls
//! against a remote management API. All operations are async and involve
//! side effects; within one invocation they run strictly sequentially.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::resource::{BrokerRecord, BrokerSpec, BrokerState};

/// Error taxonomy for provider operations.
///
/// A vanished resource discovered during a drift check is NOT an error; it is
/// reported through [`BrokerState::not_found`]. `NotFound` is reserved for the
/// explicit lookup-by-id query, where the absence itself is the answer the
/// caller asked for.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote API rejected the request. Never retried.
    #[error("remote rejected request (status {status}): {message}")]
    RemoteRejected { status: u16, message: String },

    /// Transport-level failure or unexpected 5xx. The core does not retry;
    /// the host may retry the whole operation.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Polling deadline exceeded while the resource had not settled.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Lookup by id found nothing.
    #[error("could not find broker service for id {0}")]
    NotFound(String),

    /// The response body did not match the wire schema. Never defaulted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Main Provider trait
///
/// Implemented per remote management API. The host sequences calls per
/// resource: create fully settles before update or delete is issued against
/// the same identifier.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "solace")
    fn name(&self) -> &'static str;

    /// Create a broker service and wait until it settles.
    ///
    /// Returns the fully populated record read back from the remote.
    fn create(&self, spec: &BrokerSpec) -> BoxFuture<'_, ProviderResult<BrokerRecord>>;

    /// Refresh the state of a tracked broker service.
    ///
    /// Returns `BrokerState::not_found()` if the service vanished remotely.
    fn read(&self, id: &str) -> BoxFuture<'_, ProviderResult<BrokerState>>;

    /// Rename a broker service. The name is the only field that can change
    /// in place; every other change forces a replacement upstream.
    fn update(&self, id: &str, name: &str) -> BoxFuture<'_, ProviderResult<BrokerRecord>>;

    /// Delete a broker service. Deleting an already-gone service succeeds.
    fn delete(&self, id: &str) -> BoxFuture<'_, ProviderResult<()>>;

    /// Query a broker service by id. A missing id is a `NotFound` error,
    /// not a drift signal.
    fn lookup(&self, id: &str) -> BoxFuture<'_, ProviderResult<BrokerRecord>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn create(&self, spec: &BrokerSpec) -> BoxFuture<'_, ProviderResult<BrokerRecord>> {
        (**self).create(spec)
    }

    fn read(&self, id: &str) -> BoxFuture<'_, ProviderResult<BrokerState>> {
        (**self).read(id)
    }

    fn update(&self, id: &str, name: &str) -> BoxFuture<'_, ProviderResult<BrokerRecord>> {
        (**self).update(id, name)
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(id)
    }

    fn lookup(&self, id: &str) -> BoxFuture<'_, ProviderResult<BrokerRecord>> {
        (**self).lookup(id)
    }
}
