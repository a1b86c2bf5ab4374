//! Wire model and mapping
//!
//! Typed request/response shapes of the management API and the pure
//! translation between them and the canonical [`BrokerRecord`]. Decoding is
//! schema-validated: a body that does not match fails the operation instead
//! of being defaulted.

use chrono::{DateTime, Utc};
use clustermgr_core::provider::{ProviderError, ProviderResult};
use clustermgr_core::resource::{BrokerRecord, BrokerSpec, CreationState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::naming::{null_if_empty, router_prefix};

/// Fixed substring the API puts into its (unstructured) 404 body for a
/// service that does not exist. Drift detection matches on it; if the remote
/// error format ever changes, this predicate is the one place to update.
const VANISHED_MESSAGE: &str = "Could not find event broker service with id";

/// True if a 404 body denotes a vanished service rather than a bad request.
pub fn is_vanished_message(body: &str) -> bool {
    body.contains(VANISHED_MESSAGE)
}

// =============================================================================
// Request direction
// =============================================================================

/// Body of the create call. Unset optionals are omitted entirely so the
/// server substitutes its defaults; an empty string would suppress them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    pub name: String,
    pub service_class_id: String,
    pub datacenter_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_vpn_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_router_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_broker_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_spool_usage: Option<i32>,
}

impl CreateServiceRequest {
    pub fn from_spec(spec: &BrokerSpec) -> Self {
        Self {
            name: spec.name.clone(),
            service_class_id: spec.service_class_id.clone(),
            datacenter_id: spec.datacenter_id.clone(),
            msg_vpn_name: null_if_empty(spec.msg_vpn_name.as_deref()),
            cluster_name: null_if_empty(spec.cluster_name.as_deref()),
            custom_router_name: null_if_empty(spec.custom_router_name.as_deref()),
            event_broker_version: null_if_empty(spec.event_broker_version.as_deref()),
            max_spool_usage: spec.max_spool_usage,
        }
    }
}

/// Body of the update call; the name is the only field mutable in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServiceRequest {
    pub name: String,
}

// =============================================================================
// Response direction
// =============================================================================

/// 202 envelope of the asynchronous create and delete calls.
#[derive(Debug, Deserialize)]
pub struct OperationResponse {
    pub data: OperationData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationData {
    /// Handle of the in-flight operation, not of the service itself.
    pub id: String,
    /// Identifier of the service resource the operation targets.
    #[serde(default)]
    pub resource_id: Option<String>,
}

/// 200 envelope of the get call.
#[derive(Debug, Deserialize)]
pub struct ServiceResponse {
    pub data: ServiceData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub service_class_id: Option<String>,
    #[serde(default)]
    pub datacenter_id: Option<String>,
    #[serde(default, deserialize_with = "opt_rfc3339")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_rfc3339")]
    pub updated_time: Option<DateTime<Utc>>,
    pub creation_state: CreationState,
    #[serde(default)]
    pub event_broker_service_version: Option<String>,
    #[serde(default)]
    pub broker: Option<BrokerDetail>,
    #[serde(default)]
    pub service_connection_endpoints: Option<Vec<ConnectionEndpoint>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerDetail {
    #[serde(default)]
    pub cluster: Option<ClusterDetail>,
    #[serde(default)]
    pub msg_vpns: Option<Vec<MsgVpn>>,
    #[serde(default)]
    pub max_spool_usage: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDetail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub primary_router_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgVpn {
    #[serde(default)]
    pub msg_vpn_name: Option<String>,
    #[serde(default)]
    pub mission_control_manager_login_credential: Option<Credential>,
    #[serde(default)]
    pub management_admin_login_credential: Option<Credential>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEndpoint {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub host_names: Option<Vec<String>>,
}

/// RFC3339 timestamps that may be absent or the empty string.
fn opt_rfc3339<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

/// Decode a response body, failing with `MalformedResponse` on mismatch.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> ProviderResult<T> {
    serde_json::from_slice(body).map_err(|err| ProviderError::MalformedResponse(err.to_string()))
}

/// Extract a human-readable message from an error body: the JSON error
/// object when the body conforms, the raw text otherwise (some statuses
/// answer with plain text or XML).
pub fn error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ErrorBody {
        message: Option<String>,
        validation_details: Option<serde_json::Value>,
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
            validation_details,
        }) => match validation_details {
            Some(details) => format!("{message}\nValidation Error: {details}"),
            None => message,
        },
        _ => String::from_utf8_lossy(body).into_owned(),
    }
}

// =============================================================================
// Mapping
// =============================================================================

/// Map a service response to the canonical record.
///
/// While the service is still PENDING only the basic fields are taken; the
/// expanded detail fields stay unknown. Once it reports COMPLETED the
/// expanded blocks are required, and their absence is a malformed response.
pub fn record_from_service(data: ServiceData) -> ProviderResult<BrokerRecord> {
    let mut record = BrokerRecord {
        id: data.id,
        name: data.name.unwrap_or_default(),
        service_class_id: data.service_class_id.unwrap_or_default(),
        datacenter_id: data.datacenter_id.unwrap_or_default(),
        created: data.created_time,
        last_updated: data.updated_time,
        status: data.creation_state,
        event_broker_version: data.event_broker_service_version,
        ..BrokerRecord::default()
    };

    if record.status != CreationState::Completed {
        return Ok(record);
    }

    let broker = data
        .broker
        .ok_or_else(|| malformed("settled service without broker details"))?;
    let cluster = broker
        .cluster
        .ok_or_else(|| malformed("broker details without cluster"))?;
    record.cluster_name = cluster.name;
    record.custom_router_name = cluster
        .primary_router_name
        .as_deref()
        .map(router_prefix);
    record.max_spool_usage = broker.max_spool_usage;

    let vpn = broker
        .msg_vpns
        .and_then(first)
        .ok_or_else(|| malformed("broker details without message VPNs"))?;
    record.msg_vpn_name = vpn.msg_vpn_name;
    if let Some(cred) = vpn.mission_control_manager_login_credential {
        record.missioncontrol_username = cred.username;
        record.missioncontrol_password = cred.password;
    }
    if let Some(cred) = vpn.management_admin_login_credential {
        record.admin_username = cred.username;
        record.admin_password = cred.password;
    }

    let endpoint = data
        .service_connection_endpoints
        .and_then(first)
        .ok_or_else(|| malformed("settled service without connection endpoints"))?;
    record.service_endpoint_id = endpoint.id;
    record.hostnames = endpoint.host_names.unwrap_or_default();

    Ok(record)
}

fn first<T>(mut items: Vec<T>) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items.remove(0))
    }
}

fn malformed(message: &str) -> ProviderError {
    ProviderError::MalformedResponse(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settled_body() -> serde_json::Value {
        json!({
            "data": {
                "id": "s-1234",
                "name": "ocs-prov-test",
                "serviceClassId": "ENTERPRISE_250_STANDALONE",
                "datacenterId": "aks-germanywestcentral",
                "createdTime": "2025-03-24T10:00:00Z",
                "updatedTime": "",
                "creationState": "COMPLETED",
                "eventBrokerServiceVersion": "1.2.3",
                "broker": {
                    "cluster": {
                        "name": "gwc-aks-ocs",
                        "primaryRouterName": "ocsrouterprimarycn",
                    },
                    "msgVpns": [{
                        "msgVpnName": "ocs-msgvpn",
                        "missionControlManagerLoginCredential": {
                            "username": "mc-user",
                            "password": "mc-passwd",
                            "token": "mc-token",
                        },
                        "managementAdminLoginCredential": {
                            "username": "ma-user",
                            "password": "ma-passwd",
                        },
                    }],
                    "maxSpoolUsage": 23,
                },
                "serviceConnectionEndpoints": [{
                    "id": "test-endpoint",
                    "hostNames": ["test-host1", "test-host2"],
                }],
            },
            "meta": { "additionalProp": {} }
        })
    }

    #[test]
    fn optionals_are_omitted_from_create_body() {
        let mut spec = BrokerSpec::new("broker1", "DEVELOPER", "aks-germanywestcentral");
        spec.cluster_name = Some(String::new());
        let body = serde_json::to_value(CreateServiceRequest::from_spec(&spec)).unwrap();

        let object = body.as_object().unwrap();
        assert_eq!(object.get("name"), Some(&json!("broker1")));
        // absent and empty optionals both disappear from the body
        assert!(!object.contains_key("msgVpnName"));
        assert!(!object.contains_key("clusterName"));
        assert!(!object.contains_key("maxSpoolUsage"));
    }

    #[test]
    fn set_optionals_are_sent() {
        let spec = BrokerSpec::new("broker1", "DEVELOPER", "aks-germanywestcentral")
            .with_msg_vpn_name("ocs-msgvpn")
            .with_max_spool_usage(23);
        let body = serde_json::to_value(CreateServiceRequest::from_spec(&spec)).unwrap();
        assert_eq!(body["msgVpnName"], "ocs-msgvpn");
        assert_eq!(body["maxSpoolUsage"], 23);
    }

    #[test]
    fn settled_service_maps_to_full_record() {
        let body = serde_json::to_vec(&settled_body()).unwrap();
        let response: ServiceResponse = decode(&body).unwrap();
        let record = record_from_service(response.data).unwrap();

        assert_eq!(record.id, "s-1234");
        assert_eq!(record.status, CreationState::Completed);
        assert_eq!(record.cluster_name.as_deref(), Some("gwc-aks-ocs"));
        // suffix stripped on read-back
        assert_eq!(record.custom_router_name.as_deref(), Some("ocsrouter"));
        assert_eq!(record.msg_vpn_name.as_deref(), Some("ocs-msgvpn"));
        assert_eq!(record.max_spool_usage, Some(23));
        assert_eq!(record.missioncontrol_username.as_deref(), Some("mc-user"));
        assert_eq!(record.admin_password.as_deref(), Some("ma-passwd"));
        assert_eq!(record.service_endpoint_id.as_deref(), Some("test-endpoint"));
        assert_eq!(record.hostnames, vec!["test-host1", "test-host2"]);
        assert!(record.created.is_some());
        // empty updatedTime decodes to unknown, not to an epoch value
        assert_eq!(record.last_updated, None);
    }

    #[test]
    fn pending_service_maps_to_partial_record() {
        let body = serde_json::to_vec(&json!({
            "data": {
                "id": "s-1234",
                "name": "ocs-prov-test",
                "createdTime": "2025-03-24T10:00:00Z",
                "updatedTime": "",
                "creationState": "PENDING",
            },
            "meta": { "additionalProp": {} }
        }))
        .unwrap();
        let response: ServiceResponse = decode(&body).unwrap();
        let record = record_from_service(response.data).unwrap();

        assert_eq!(record.status, CreationState::Pending);
        assert_eq!(record.cluster_name, None);
        assert_eq!(record.missioncontrol_username, None);
        assert!(record.hostnames.is_empty());
    }

    #[test]
    fn settled_service_without_details_is_malformed() {
        let mut body = settled_body();
        body["data"]
            .as_object_mut()
            .unwrap()
            .remove("broker");
        let response: ServiceResponse =
            decode(&serde_json::to_vec(&body).unwrap()).unwrap();

        let err = record_from_service(response.data).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn unknown_creation_state_fails_decode() {
        let body = serde_json::to_vec(&json!({
            "data": { "id": "s-1", "creationState": "EXPLODED" }
        }))
        .unwrap();
        let err = decode::<ServiceResponse>(&body).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn error_message_prefers_the_json_object() {
        let body = serde_json::to_vec(&json!({
            "message": "invalid service class",
            "validationDetails": { "serviceClassId": "unknown" }
        }))
        .unwrap();
        let message = error_message(&body);
        assert!(message.starts_with("invalid service class"));
        assert!(message.contains("serviceClassId"));

        // non-conforming bodies surface as raw text
        assert_eq!(error_message(b"<ErrorDTO>boom</ErrorDTO>"), "<ErrorDTO>boom</ErrorDTO>");
    }

    #[test]
    fn vanished_predicate_matches_the_fixed_substring() {
        assert!(is_vanished_message(
            "Could not find event broker service with id s-1234"
        ));
        assert!(!is_vanished_message("Not Found"));
    }
}
