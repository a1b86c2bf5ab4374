//! Resource - broker specs, canonical records and their read state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the management API for a broker service.
///
/// A service that no longer exists remotely is not a state of its own; it is
/// expressed through [`BrokerState::not_found`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreationState {
    /// Provisioning accepted but not finished; detail fields are unknown.
    #[default]
    Pending,
    /// Provisioning finished; the full record is available.
    Completed,
}

/// Desired broker configuration as declared by the user.
///
/// `service_class_id` and `datacenter_id` are immutable after creation -
/// changing them forces a replacement, which the host enforces through its
/// plan step. The optional fields are filled with server-side defaults when
/// left unset; an unset or empty value must be omitted from the create
/// request so the defaulting logic on the remote side activates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerSpec {
    pub name: String,
    /// Service class like DEVELOPER or ENTERPRISE_250_STANDALONE (see API docs).
    pub service_class_id: String,
    /// Datacenter identifier, e.g. aks-germanywestcentral.
    pub datacenter_id: String,
    pub msg_vpn_name: Option<String>,
    pub cluster_name: Option<String>,
    /// Router name prefix; the remote suffixes the actual router name.
    pub custom_router_name: Option<String>,
    pub event_broker_version: Option<String>,
    /// Message spool size in gigabytes.
    pub max_spool_usage: Option<i32>,
}

impl BrokerSpec {
    pub fn new(
        name: impl Into<String>,
        service_class_id: impl Into<String>,
        datacenter_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service_class_id: service_class_id.into(),
            datacenter_id: datacenter_id.into(),
            msg_vpn_name: None,
            cluster_name: None,
            custom_router_name: None,
            event_broker_version: None,
            max_spool_usage: None,
        }
    }

    pub fn with_msg_vpn_name(mut self, value: impl Into<String>) -> Self {
        self.msg_vpn_name = Some(value.into());
        self
    }

    pub fn with_cluster_name(mut self, value: impl Into<String>) -> Self {
        self.cluster_name = Some(value.into());
        self
    }

    pub fn with_custom_router_name(mut self, value: impl Into<String>) -> Self {
        self.custom_router_name = Some(value.into());
        self
    }

    pub fn with_event_broker_version(mut self, value: impl Into<String>) -> Self {
        self.event_broker_version = Some(value.into());
        self
    }

    pub fn with_max_spool_usage(mut self, value: i32) -> Self {
        self.max_spool_usage = Some(value);
        self
    }
}

/// Canonical local representation of a remote broker service.
///
/// The expanded detail fields (cluster, credentials, endpoint) are populated
/// only once the service has settled to [`CreationState::Completed`]; while
/// `Pending` they are `None` and must be treated as unknown, not as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrokerRecord {
    /// Remote identifier of the service, distinct from operation handles.
    pub id: String,
    pub name: String,
    pub service_class_id: String,
    pub datacenter_id: String,
    pub created: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub status: CreationState,
    pub cluster_name: Option<String>,
    /// Router prefix recovered from the full router name.
    pub custom_router_name: Option<String>,
    pub msg_vpn_name: Option<String>,
    pub event_broker_version: Option<String>,
    pub max_spool_usage: Option<i32>,
    pub missioncontrol_username: Option<String>,
    pub missioncontrol_password: Option<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub service_endpoint_id: Option<String>,
    pub hostnames: Vec<String>,
}

/// Result of refreshing a tracked broker service against the remote.
///
/// `exists == false` means the service vanished out-of-band; the host should
/// drop it from tracked state rather than report an error.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerState {
    pub exists: bool,
    pub record: Option<BrokerRecord>,
}

impl BrokerState {
    pub fn not_found() -> Self {
        Self {
            exists: false,
            record: None,
        }
    }

    pub fn existing(record: BrokerRecord) -> Self {
        Self {
            exists: true,
            record: Some(record),
        }
    }
}
