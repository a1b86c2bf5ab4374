//! Mission-control transport client
//!
//! Thin wrapper over reqwest: adds the bearer-token header, sends the call
//! and hands status plus raw body back to the lifecycle controller without
//! retry or interpretation.

use std::time::Duration;

use clustermgr_core::provider::{ProviderError, ProviderResult};
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::wire::{CreateServiceRequest, UpdateServiceRequest};

/// Expansion requested on reads: nested broker details and endpoints.
pub const EXPAND_QUERY: &str = "broker,serviceConnectionEndpoints";

const READ_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw outcome of one API call.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Authenticated HTTP client for the event-broker management API.
///
/// Carries no per-resource state; one instance is shared read-only across
/// all lifecycle operations the host runs.
pub struct MissionControlClient {
    http: Client,
    services_url: String,
    bearer_token: String,
}

impl MissionControlClient {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(READ_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|err| {
                ProviderError::RemoteUnavailable(format!("failed to build HTTP client: {err}"))
            })?;

        Ok(Self {
            http,
            services_url: format!(
                "{}/api/v2/missionControl/eventBrokerServices",
                config.host.trim_end_matches('/')
            ),
            bearer_token: config.bearer_token.clone(),
        })
    }

    pub async fn create_service(&self, body: &CreateServiceRequest) -> ProviderResult<ApiResponse> {
        let request = self.http.post(&self.services_url).json(body);
        self.execute(request).await
    }

    pub async fn get_service(&self, id: &str, expand: bool) -> ProviderResult<ApiResponse> {
        let mut request = self.http.get(format!("{}/{id}", self.services_url));
        if expand {
            request = request.query(&[("expand", EXPAND_QUERY)]);
        }
        self.execute(request).await
    }

    pub async fn update_service(
        &self,
        id: &str,
        body: &UpdateServiceRequest,
    ) -> ProviderResult<ApiResponse> {
        let request = self
            .http
            .patch(format!("{}/{id}", self.services_url))
            .json(body);
        self.execute(request).await
    }

    pub async fn delete_service(&self, id: &str) -> ProviderResult<ApiResponse> {
        let request = self.http.delete(format!("{}/{id}", self.services_url));
        self.execute(request).await
    }

    async fn execute(&self, request: RequestBuilder) -> ProviderResult<ApiResponse> {
        let response = request
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|err| ProviderError::RemoteUnavailable(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| ProviderError::RemoteUnavailable(err.to_string()))?
            .to_vec();
        debug!(%status, body = %String::from_utf8_lossy(&body), "api response");

        Ok(ApiResponse { status, body })
    }
}
