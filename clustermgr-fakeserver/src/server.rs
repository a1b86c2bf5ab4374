//! Fakeserver HTTP service
//!
//! Serves the mission-control wire shape over a local port. Create and
//! delete answer 202 with an operation handle; a created service settles
//! from PENDING to COMPLETED once the configured delay has elapsed since
//! creation, observed through GET. Unknown ids answer 404 with the same
//! plain-text body the real API emits.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::{ServiceInfo, ServiceStore};

/// Server defaults substituted when a create request omits the optionals.
pub const DEFAULT_MSG_VPN_NAME: &str = "test-vpn1";
pub const DEFAULT_CLUSTER_NAME: &str = "test-cluster1";
pub const DEFAULT_ROUTER_PREFIX: &str = "testrouter1";
pub const DEFAULT_BROKER_VERSION: &str = "1.0.0";
pub const DEFAULT_MAX_SPOOL_USAGE: i32 = 20;

/// How identifiers for created services are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMode {
    /// Random v4 UUIDs.
    Random,
    /// Sequential integers starting at the given base, for deterministic tests.
    Sequential(u64),
}

/// Fakeserver tunables.
#[derive(Debug, Clone, Copy)]
pub struct FakeServerConfig {
    /// Time after creation at which a PENDING service reports COMPLETED.
    pub settle_delay: Duration,
    pub id_mode: IdMode,
}

impl Default for FakeServerConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(10),
            id_mode: IdMode::Random,
        }
    }
}

impl FakeServerConfig {
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_id_mode(mut self, mode: IdMode) -> Self {
        self.id_mode = mode;
        self
    }
}

#[derive(Clone)]
struct AppState {
    store: Arc<dyn ServiceStore>,
    settle_delay: Duration,
    /// 0 selects UUID generation, any other value is the next sequential id.
    next_sid: Arc<AtomicU64>,
}

impl AppState {
    fn next_id(&self) -> String {
        match self.next_sid.load(Ordering::SeqCst) {
            0 => Uuid::new_v4().to_string(),
            _ => self.next_sid.fetch_add(1, Ordering::SeqCst).to_string(),
        }
    }
}

/// A running fakeserver bound to a local port.
pub struct FakeServer {
    addr: SocketAddr,
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl FakeServer {
    /// Bind and start serving on 127.0.0.1. Port 0 picks an ephemeral port.
    pub async fn start(
        port: u16,
        store: Arc<dyn ServiceStore>,
        config: FakeServerConfig,
    ) -> std::io::Result<Self> {
        let state = AppState {
            store,
            settle_delay: config.settle_delay,
            next_sid: Arc::new(AtomicU64::new(match config.id_mode {
                IdMode::Random => 0,
                IdMode::Sequential(base) => base,
            })),
        };

        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let addr = listener.local_addr()?;
        let app = router(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = serve.await {
                debug!(%err, "fakeserver stopped serving");
            }
        });

        info!(%addr, "fakeserver ready");
        Ok(Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Switch id generation to a sequence starting at `base`.
    pub fn set_base_sid(&self, base: u64) {
        self.state.next_sid.store(base, Ordering::SeqCst);
    }

    /// Stop serving and wait for the server task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.handle).await;
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v2/missionControl/eventBrokerServices",
            post(create_service),
        )
        .route(
            "/api/v2/missionControl/eventBrokerServices/{id}",
            get(get_service)
                .patch(update_service)
                .delete(delete_service),
        )
        .with_state(state)
}

/// The 404 body of the real API is plain text, not the documented error
/// object; the provider matches on this substring.
fn vanished(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        format!("Could not find event broker service with id {id}"),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateServiceBody {
    name: String,
    service_class_id: String,
    datacenter_id: String,
    msg_vpn_name: Option<String>,
    cluster_name: Option<String>,
    custom_router_name: Option<String>,
    event_broker_version: Option<String>,
    max_spool_usage: Option<i32>,
}

async fn create_service(
    State(state): State<AppState>,
    body: Result<Json<CreateServiceBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            // answer with the JSON error object shape of the API
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": rejection.body_text() })),
            )
                .into_response();
        }
    };

    if body.name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "invalid service configuration",
                "validationDetails": { "name": "must not be empty" },
            })),
        )
            .into_response();
    }

    let sid = state.next_id();
    let info = ServiceInfo {
        id: sid.clone(),
        name: body.name,
        state: "PENDING".to_string(),
        created: Utc::now(),
        updated: None,
        service_class_id: body.service_class_id,
        datacenter_id: body.datacenter_id,
        msg_vpn_name: body
            .msg_vpn_name
            .unwrap_or_else(|| DEFAULT_MSG_VPN_NAME.to_string()),
        cluster_name: body
            .cluster_name
            .unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string()),
        // a user-supplied prefix gets the primarycn suffix, the generated
        // default router name ends in plain primary
        router_name: match body.custom_router_name {
            Some(prefix) => format!("{prefix}primarycn"),
            None => format!("{DEFAULT_ROUTER_PREFIX}primary"),
        },
        event_broker_version: body
            .event_broker_version
            .unwrap_or_else(|| DEFAULT_BROKER_VERSION.to_string()),
        max_spool_usage: body.max_spool_usage.unwrap_or(DEFAULT_MAX_SPOOL_USAGE),
    };
    debug!(id = %info.id, name = %info.name, "created service");

    let result = json!({
        "data": {
            // the id of the operation, distinct from the service resource id
            "id": format!("O{sid}"),
            "resourceId": sid,
            "name": info.name,
            "createdTime": info.created.to_rfc3339(),
            "creationState": info.state,
        },
        "meta": { "additionalProp": {} }
    });
    state.store.put(info);

    (StatusCode::ACCEPTED, Json(result)).into_response()
}

async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(mut info) = state.store.get(&id) else {
        return vanished(&id);
    };

    // complete creation once the settle delay has passed
    let elapsed = Utc::now()
        .signed_duration_since(info.created)
        .to_std()
        .unwrap_or_default();
    if info.state == "PENDING" && elapsed >= state.settle_delay {
        info.state = "COMPLETED".to_string();
        state.store.put(info.clone());
    }
    debug!(id = %info.id, state = %info.state, "get service");

    let expand = params.contains_key("expand");
    Json(service_body(&info, expand)).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateServiceBody {
    name: String,
}

async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateServiceBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": rejection.body_text() })),
            )
                .into_response();
        }
    };
    let Some(info) = state.store.get(&id) else {
        return vanished(&id);
    };

    let renamed = ServiceInfo {
        name: body.name,
        updated: Some(Utc::now()),
        ..info
    };
    debug!(id = %renamed.id, name = %renamed.name, "renamed service");
    state.store.put(renamed.clone());

    // the update response never carries the expanded blocks
    Json(service_body(&renamed, false)).into_response()
}

async fn delete_service(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(info) = state.store.remove(&id) else {
        return vanished(&id);
    };
    debug!(id = %info.id, "deleted service");

    let result = json!({
        "data": {
            "id": format!("O{}", info.id),
            "resourceId": info.id,
            "name": info.name,
            "createdTime": info.created.to_rfc3339(),
            "status": "PENDING",
        },
        "meta": { "additionalProp": {} }
    });
    (StatusCode::ACCEPTED, Json(result)).into_response()
}

fn service_body(info: &ServiceInfo, expand: bool) -> Value {
    let mut data = json!({
        "id": info.id,
        "name": info.name,
        "serviceClassId": info.service_class_id,
        "datacenterId": info.datacenter_id,
        "createdTime": info.created.to_rfc3339(),
        // an unset updated time goes out as the empty string, as observed
        "updatedTime": info.updated.map(|t| t.to_rfc3339()).unwrap_or_default(),
        "creationState": info.state,
        "eventBrokerServiceVersion": info.event_broker_version,
    });

    // the expanded blocks exist only once provisioning has finished
    if expand && info.state == "COMPLETED" {
        data["broker"] = json!({
            "cluster": {
                "name": info.cluster_name,
                "primaryRouterName": info.router_name,
            },
            "msgVpns": [{
                "msgVpnName": info.msg_vpn_name,
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
            "maxSpoolUsage": info.max_spool_usage,
        });
        data["serviceConnectionEndpoints"] = json!([{
            "id": "test-endpoint",
            "hostNames": ["test-host1", "test-host2"],
        }]);
    }

    json!({ "data": data, "meta": { "additionalProp": {} } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn test_state(id_mode: IdMode) -> AppState {
        AppState {
            store: Arc::new(MemoryStore::new()),
            settle_delay: Duration::from_secs(10),
            next_sid: Arc::new(AtomicU64::new(match id_mode {
                IdMode::Random => 0,
                IdMode::Sequential(base) => base,
            })),
        }
    }

    #[test]
    fn sequential_ids_count_up_from_base() {
        let state = test_state(IdMode::Sequential(1234));
        assert_eq!(state.next_id(), "1234");
        assert_eq!(state.next_id(), "1235");
    }

    #[test]
    fn random_ids_are_unique() {
        let state = test_state(IdMode::Random);
        assert_ne!(state.next_id(), state.next_id());
    }

    #[test]
    fn expanded_body_requires_settled_state() {
        let info = ServiceInfo {
            id: "s1".to_string(),
            name: "broker1".to_string(),
            state: "PENDING".to_string(),
            created: Utc::now(),
            updated: None,
            service_class_id: "DEVELOPER".to_string(),
            datacenter_id: "aks-germanywestcentral".to_string(),
            msg_vpn_name: DEFAULT_MSG_VPN_NAME.to_string(),
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            router_name: format!("{DEFAULT_ROUTER_PREFIX}primary"),
            event_broker_version: DEFAULT_BROKER_VERSION.to_string(),
            max_spool_usage: DEFAULT_MAX_SPOOL_USAGE,
        };

        let pending = service_body(&info, true);
        assert!(pending["data"].get("broker").is_none());
        assert_eq!(pending["data"]["updatedTime"], "");

        let settled = ServiceInfo {
            state: "COMPLETED".to_string(),
            ..info
        };
        let body = service_body(&settled, true);
        assert_eq!(body["data"]["broker"]["cluster"]["name"], "test-cluster1");
        assert_eq!(
            body["data"]["serviceConnectionEndpoints"][0]["id"],
            "test-endpoint"
        );

        let unexpanded = service_body(&settled, false);
        assert!(unexpanded["data"].get("broker").is_none());
    }
}
