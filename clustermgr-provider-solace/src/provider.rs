//! Solace lifecycle controller
//!
//! Orchestrates create, poll-until-settled, read-back, rename and delete
//! against the mission-control API, including drift detection for services
//! removed out-of-band.

use std::time::{Duration, Instant};

use clustermgr_core::provider::{ProviderError, ProviderResult};
use clustermgr_core::resource::{BrokerRecord, BrokerSpec, BrokerState, CreationState};
use tracing::{debug, info, warn};

use crate::client::MissionControlClient;
use crate::config::ProviderConfig;
use crate::wire::{
    self, CreateServiceRequest, OperationResponse, ServiceResponse, UpdateServiceRequest,
};

/// Outcome of one full read against the remote.
enum GetOutcome {
    Found(BrokerRecord),
    Vanished,
}

/// Lifecycle controller for event-broker services.
///
/// One instance is shared across lifecycle operations; each operation owns
/// its record exclusively until it returns it to the host.
pub struct SolaceProvider {
    client: MissionControlClient,
    polling_interval: Duration,
    polling_timeout: Duration,
}

impl SolaceProvider {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: MissionControlClient::new(&config)?,
            polling_interval: config.polling_interval,
            polling_timeout: config.polling_timeout,
        })
    }

    // =========================================================================
    // Lifecycle Operations
    // =========================================================================

    /// Create a broker service and poll until it settles.
    ///
    /// The create call is accepted asynchronously; the service id arrives
    /// alongside the operation handle and is polled with full reads until
    /// the service reports COMPLETED or the polling timeout fires. Poll
    /// errors are fatal: the loop only retries on not-yet-complete, never
    /// on error.
    pub async fn create_broker(&self, spec: &BrokerSpec) -> ProviderResult<BrokerRecord> {
        let body = CreateServiceRequest::from_spec(spec);
        info!(name = %spec.name, "creating broker service");

        let resp = self.client.create_service(&body).await?;
        let status = resp.status.as_u16();
        if status != 202 {
            return Err(ProviderError::RemoteRejected {
                status,
                message: rejection_message(status, &resp.body),
            });
        }

        let operation: OperationResponse = wire::decode(&resp.body)?;
        let service_id = operation.data.resource_id.ok_or_else(|| {
            ProviderError::MalformedResponse("create response without resourceId".to_string())
        })?;
        info!(
            id = %service_id,
            operation = %operation.data.id,
            "waiting for broker service to finish creation"
        );

        // the API offers no poll-by-operation, so the service itself is
        // re-read at a fixed interval until the deadline decides
        let deadline = Instant::now() + self.polling_timeout;
        loop {
            if Instant::now() > deadline {
                return Err(ProviderError::Timeout(format!(
                    "broker service {service_id} did not settle within {:?}",
                    self.polling_timeout
                )));
            }
            tokio::time::sleep(self.polling_interval).await;

            match self.full_get(&service_id).await? {
                GetOutcome::Found(record) if record.status == CreationState::Completed => {
                    info!(id = %service_id, "broker service settled");
                    return Ok(record);
                }
                GetOutcome::Found(record) => {
                    debug!(id = %service_id, status = ?record.status, "broker service still provisioning");
                }
                GetOutcome::Vanished => {
                    // not visible yet; keep polling until the deadline decides
                    warn!(id = %service_id, "broker service not visible yet");
                }
            }
        }
    }

    /// Refresh the state of a tracked broker service.
    ///
    /// A vanished service is not an error: the host drops it from tracked
    /// state.
    pub async fn read_broker(&self, id: &str) -> ProviderResult<BrokerState> {
        match self.full_get(id).await? {
            GetOutcome::Found(record) => Ok(BrokerState::existing(record)),
            GetOutcome::Vanished => {
                info!(id, "removing vanished broker service from tracked state");
                Ok(BrokerState::not_found())
            }
        }
    }

    /// Rename a broker service.
    ///
    /// The remote models renames as asynchronous too, but they are quick;
    /// the immediately returned status is accepted without polling. The
    /// update response carries no expanded details, so the full record is
    /// read back instead of trusting it.
    pub async fn update_broker(&self, id: &str, name: &str) -> ProviderResult<BrokerRecord> {
        let body = UpdateServiceRequest {
            name: name.to_string(),
        };
        info!(id, name, "renaming broker service");

        let resp = self.client.update_service(id, &body).await?;
        let status = resp.status.as_u16();
        // a vanished service is not tolerated here; 404 fails the update
        if status != 200 {
            return Err(ProviderError::RemoteRejected {
                status,
                message: rejection_message(status, &resp.body),
            });
        }

        match self.full_get(id).await? {
            GetOutcome::Found(record) => {
                info!(id, status = ?record.status, "renamed broker service");
                Ok(record)
            }
            GetOutcome::Vanished => Err(ProviderError::NotFound(id.to_string())),
        }
    }

    /// Delete a broker service. Deleting an already-gone service succeeds.
    ///
    /// Success is the 202 acceptance of the delete operation; its completion
    /// is not awaited.
    pub async fn delete_broker(&self, id: &str) -> ProviderResult<()> {
        info!(id, "deleting broker service");
        let resp = self.client.delete_service(id).await?;
        let status = resp.status.as_u16();
        if status != 202 {
            // likely already detected as vanished during an earlier read
            if status == 404 && wire::is_vanished_message(&resp.body_text()) {
                warn!(id, "could not find event broker service, delete is a no-op");
                return Ok(());
            }
            return Err(ProviderError::RemoteRejected {
                status,
                message: rejection_message(status, &resp.body),
            });
        }

        let operation: OperationResponse = wire::decode(&resp.body)?;
        debug!(id, operation = %operation.data.id, "delete operation started");
        Ok(())
    }

    /// Query a broker service by id.
    ///
    /// Unlike [`Self::read_broker`], absence is the query's answer: a missing
    /// id surfaces as a `NotFound` error, not as a drift signal.
    pub async fn lookup_broker(&self, id: &str) -> ProviderResult<BrokerRecord> {
        let resp = self.client.get_service(id, true).await?;
        let status = resp.status.as_u16();
        match status {
            200 => {
                let response: ServiceResponse = wire::decode(&resp.body)?;
                wire::record_from_service(response.data)
            }
            404 => Err(ProviderError::NotFound(id.to_string())),
            _ => Err(ProviderError::RemoteRejected {
                status,
                message: rejection_message(status, &resp.body),
            }),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// One GET with full expansion, classifying the vanished case.
    async fn full_get(&self, id: &str) -> ProviderResult<GetOutcome> {
        let resp = self.client.get_service(id, true).await?;
        let status = resp.status.as_u16();
        match status {
            200 => {
                let response: ServiceResponse = wire::decode(&resp.body)?;
                Ok(GetOutcome::Found(wire::record_from_service(response.data)?))
            }
            404 if wire::is_vanished_message(&resp.body_text()) => {
                warn!(id, "could not find event broker service");
                Ok(GetOutcome::Vanished)
            }
            _ => Err(ProviderError::RemoteRejected {
                status,
                message: rejection_message(status, &resp.body),
            }),
        }
    }
}

/// Statuses the API documents with an error object get their message
/// extracted; everything else is reported as an unexpected code.
fn rejection_message(status: u16, body: &[u8]) -> String {
    match status {
        400 | 401 | 403 | 503 => wire::error_message(body),
        _ => format!("unexpected response code: {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use clustermgr_fakeserver::{FakeServer, FakeServerConfig, MemoryStore};

    const INTERVAL: Duration = Duration::from_millis(100);
    const TIMEOUT: Duration = Duration::from_secs(15);

    async fn start_server(settle: Duration) -> FakeServer {
        FakeServer::start(
            0,
            Arc::new(MemoryStore::new()),
            FakeServerConfig::default().with_settle_delay(settle),
        )
        .await
        .expect("fakeserver should bind an ephemeral port")
    }

    fn provider_for(server: &FakeServer, timeout: Duration) -> SolaceProvider {
        SolaceProvider::new(
            ProviderConfig::new(server.base_url(), "bt42").with_polling(INTERVAL, timeout),
        )
        .expect("provider should build")
    }

    fn full_spec() -> BrokerSpec {
        BrokerSpec::new(
            "ocs-prov-test",
            "ENTERPRISE_250_STANDALONE",
            "aks-germanywestcentral",
        )
        .with_msg_vpn_name("ocs-msgvpn")
        .with_cluster_name("gwc-aks-ocs")
        .with_custom_router_name("ocsrouter")
        .with_event_broker_version("1.2.3")
        .with_max_spool_usage(23)
    }

    #[tokio::test]
    async fn create_settles_within_timeout() {
        let server = start_server(Duration::from_millis(500)).await;
        let provider = provider_for(&server, TIMEOUT);

        let record = provider.create_broker(&full_spec()).await.unwrap();
        assert_eq!(record.status, CreationState::Completed);
        assert_eq!(record.name, "ocs-prov-test");
        assert_eq!(record.service_class_id, "ENTERPRISE_250_STANDALONE");
        assert_eq!(record.datacenter_id, "aks-germanywestcentral");
        assert_eq!(record.msg_vpn_name.as_deref(), Some("ocs-msgvpn"));
        assert_eq!(record.cluster_name.as_deref(), Some("gwc-aks-ocs"));
        // the fakeserver suffixes primarycn, reading back recovers the prefix
        assert_eq!(record.custom_router_name.as_deref(), Some("ocsrouter"));
        assert_eq!(record.event_broker_version.as_deref(), Some("1.2.3"));
        assert_eq!(record.max_spool_usage, Some(23));
        assert_eq!(record.missioncontrol_username.as_deref(), Some("mc-user"));
        assert_eq!(record.missioncontrol_password.as_deref(), Some("mc-passwd"));
        assert_eq!(record.admin_username.as_deref(), Some("ma-user"));
        assert_eq!(record.admin_password.as_deref(), Some("ma-passwd"));
        assert_eq!(record.service_endpoint_id.as_deref(), Some("test-endpoint"));
        assert_eq!(record.hostnames, vec!["test-host1", "test-host2"]);
        assert!(record.created.is_some());
        assert_eq!(record.last_updated, None);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn create_fills_server_defaults() {
        let server = start_server(Duration::from_millis(300)).await;
        let provider = provider_for(&server, TIMEOUT);

        let spec = BrokerSpec::new(
            "ocs-prov-test2",
            "ENTERPRISE_250_STANDALONE",
            "aks-germanywestcentral",
        );
        let record = provider.create_broker(&spec).await.unwrap();
        assert_eq!(record.msg_vpn_name.as_deref(), Some("test-vpn1"));
        assert_eq!(record.cluster_name.as_deref(), Some("test-cluster1"));
        assert_eq!(record.custom_router_name.as_deref(), Some("testrouter1"));
        assert_eq!(record.event_broker_version.as_deref(), Some("1.0.0"));
        assert_eq!(record.max_spool_usage, Some(20));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn create_times_out_when_settling_is_slow() {
        let server = start_server(Duration::from_secs(60)).await;
        let provider = provider_for(&server, Duration::from_millis(400));

        let err = provider.create_broker(&full_spec()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)), "got {err}");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn create_rejection_surfaces_the_error_message() {
        let server = start_server(Duration::from_millis(100)).await;
        let provider = provider_for(&server, TIMEOUT);

        let spec = BrokerSpec::new("", "DEVELOPER", "aks-germanywestcentral");
        let err = provider.create_broker(&spec).await.unwrap_err();
        match err {
            ProviderError::RemoteRejected { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("invalid service configuration"), "got {message}");
                assert!(message.contains("must not be empty"), "got {message}");
            }
            other => panic!("expected RemoteRejected, got {other}"),
        }

        server.shutdown().await;
    }

    #[tokio::test]
    async fn read_reports_vanished_service_as_not_found_state() {
        let server = start_server(Duration::from_millis(100)).await;
        let provider = provider_for(&server, TIMEOUT);

        let record = provider.create_broker(&full_spec()).await.unwrap();
        // removed behind the provider's back
        provider.delete_broker(&record.id).await.unwrap();

        let state = provider.read_broker(&record.id).await.unwrap();
        assert!(!state.exists);
        assert!(state.record.is_none());

        server.shutdown().await;
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let server = start_server(Duration::from_millis(100)).await;
        let provider = provider_for(&server, TIMEOUT);

        let record = provider.create_broker(&full_spec()).await.unwrap();
        provider.delete_broker(&record.id).await.unwrap();
        // the second delete hits the vanished path and is tolerated
        provider.delete_broker(&record.id).await.unwrap();

        server.shutdown().await;
    }

    #[tokio::test]
    async fn update_renames_and_reads_back() {
        let server = start_server(Duration::from_millis(100)).await;
        let provider = provider_for(&server, TIMEOUT);

        let record = provider.create_broker(&full_spec()).await.unwrap();
        let renamed = provider
            .update_broker(&record.id, "ocs-prov-test-changed")
            .await
            .unwrap();
        assert_eq!(renamed.name, "ocs-prov-test-changed");
        assert!(renamed.last_updated.is_some());
        // whatever state the remote reports at that instant is accepted
        assert_eq!(renamed.status, CreationState::Completed);

        let state = provider.read_broker(&record.id).await.unwrap();
        assert_eq!(
            state.record.unwrap().name,
            "ocs-prov-test-changed"
        );

        server.shutdown().await;
    }

    #[tokio::test]
    async fn update_of_missing_service_is_an_error() {
        let server = start_server(Duration::from_millis(100)).await;
        let provider = provider_for(&server, TIMEOUT);

        let err = provider
            .update_broker("NotExisting1", "new-name")
            .await
            .unwrap_err();
        assert!(
            matches!(err, ProviderError::RemoteRejected { status: 404, .. }),
            "got {err}"
        );

        server.shutdown().await;
    }

    #[tokio::test]
    async fn lookup_miss_is_a_user_visible_error() {
        let server = start_server(Duration::from_millis(100)).await;
        let provider = provider_for(&server, TIMEOUT);

        let err = provider.lookup_broker("NotExisting1").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not find broker service for id NotExisting1"
        );

        server.shutdown().await;
    }

    #[tokio::test]
    async fn lookup_returns_the_settled_record() {
        let server = start_server(Duration::from_millis(100)).await;
        server.set_base_sid(1234);
        let provider = provider_for(&server, TIMEOUT);

        provider.create_broker(&full_spec()).await.unwrap();
        let record = provider.lookup_broker("1234").await.unwrap();
        assert_eq!(record.id, "1234");
        assert_eq!(record.msg_vpn_name.as_deref(), Some("ocs-msgvpn"));
        assert_eq!(record.admin_username.as_deref(), Some("ma-user"));

        server.shutdown().await;
    }
}
