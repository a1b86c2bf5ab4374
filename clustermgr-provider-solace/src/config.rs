//! Provider configuration
//!
//! Supplied by the host; the core only consumes it.

use std::time::Duration;

/// How long to wait between poll reads while a create settles.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(10);
/// Wall-clock budget for a create to settle before it fails with a timeout.
pub const DEFAULT_POLLING_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Configuration for the Solace provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the management API, e.g. `https://api.solace.cloud`.
    pub host: String,
    /// Bearer token sent on every request.
    pub bearer_token: String,
    pub polling_interval: Duration,
    pub polling_timeout: Duration,
}

impl ProviderConfig {
    pub fn new(host: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            bearer_token: bearer_token.into(),
            polling_interval: DEFAULT_POLLING_INTERVAL,
            polling_timeout: DEFAULT_POLLING_TIMEOUT,
        }
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.polling_interval = interval;
        self.polling_timeout = timeout;
        self
    }
}
