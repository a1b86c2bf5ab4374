//! Service object store
//!
//! The fakeserver keeps its service objects behind a small store trait so the
//! HTTP handlers never touch shared mutable structures directly: a handler
//! reads a value, builds a new one, and puts it back. The in-memory
//! implementation is injected at server construction.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

/// One broker service as held by the fakeserver.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    /// Wire-level creation state, `PENDING` or `COMPLETED`.
    pub state: String,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub service_class_id: String,
    pub datacenter_id: String,
    pub msg_vpn_name: String,
    pub cluster_name: String,
    /// Full router name including the primary/primarycn suffix.
    pub router_name: String,
    pub event_broker_version: String,
    pub max_spool_usage: i32,
}

/// Keyed store for service objects.
///
/// Values move by copy: `get` clones, `put` replaces. This keeps handler
/// logic free of aliasing across concurrent requests.
pub trait ServiceStore: Send + Sync {
    fn get(&self, id: &str) -> Option<ServiceInfo>;
    fn put(&self, info: ServiceInfo);
    fn remove(&self, id: &str) -> Option<ServiceInfo>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store used by tests and the standalone fakeserver binary.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, ServiceInfo>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ServiceStore for MemoryStore {
    fn get(&self, id: &str) -> Option<ServiceInfo> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn put(&self, info: ServiceInfo) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(info.id.clone(), info);
    }

    fn remove(&self, id: &str) -> Option<ServiceInfo> {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
