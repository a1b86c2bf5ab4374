//! Clustermgr Fakeserver
//!
//! In-memory mock of the mission-control event-broker API, used to test the
//! provider without touching the real service. Mimics the wire shape of the
//! management API: asynchronous create/delete returning operation handles,
//! services that settle from PENDING to COMPLETED after a configurable delay,
//! and the plain-text 404 body the real API emits for unknown ids.
//!
//! ## Module Structure
//!
//! - `server` - the HTTP service and its configuration
//! - `store` - the injectable key-value store holding service objects

pub mod server;
pub mod store;

// Re-export main types
pub use server::{FakeServer, FakeServerConfig, IdMode};
pub use store::{MemoryStore, ServiceInfo, ServiceStore};
