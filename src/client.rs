use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::{Credential, CredentialManager};
use crate::config::Config;
use crate::error::{CrmError, OperationFailure, OperationOutcome};
use crate::models::lead::{CreateLeadRequest, ListLeadsQuery};

/// Response header the CRM uses to carry a correlation id
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fallback when a rejection body has no usable message
const GENERIC_ERROR_MESSAGE: &str = "unknown CRM error";

/// Error body shape the CRM uses for rejections
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Authenticated CRM client with one-shot re-login on 401
pub struct KrayinClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Credential lifecycle manager
    credentials: Arc<CredentialManager>,

    /// CRM base URL without a trailing slash
    base_url: String,
}

impl KrayinClient {
    /// Create a new CRM client
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.http_max_connections)
            .connect_timeout(Duration::from_secs(config.http_connect_timeout))
            .timeout(Duration::from_secs(config.http_request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        let credentials = Arc::new(CredentialManager::new(
            client.clone(),
            config.login_settings(),
        ));

        Ok(Self {
            client,
            credentials,
            base_url: config.base_url.clone(),
        })
    }

    /// Force a login and return the resulting credential, bypassing any cache
    pub async fn verify_login(&self) -> Result<Credential, CrmError> {
        self.credentials.credential(true).await
    }

    /// Create a lead
    pub async fn create_lead(&self, lead: &CreateLeadRequest) -> OperationOutcome<Value> {
        debug!("Creating lead: {}", lead.title);
        let request = self.client.post(self.leads_url()).json(lead);
        self.execute(request).await
    }

    /// List leads with optional sort and paging parameters
    pub async fn list_leads(&self, query: &ListLeadsQuery) -> OperationOutcome<Value> {
        debug!(?query, "Listing leads");
        let request = self.client.get(self.leads_url()).query(query);
        self.execute(request).await
    }

    fn leads_url(&self) -> String {
        format!("{}/api/v1/leads", self.base_url)
    }

    /// Execute a request with at most one re-login retry.
    ///
    /// A 401 invalidates the cached credential, forces a refresh, and repeats
    /// the request exactly once. A second 401 comes back as a normal provider
    /// failure, so a provider that always rejects cannot cause a loop.
    /// Transport failures are returned immediately without touching the
    /// credential.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> OperationOutcome<T> {
        let credential = self.credentials.credential(false).await?;
        let response = self.dispatch(&request, &credential).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Received 401, refreshing credential and retrying once");
            self.credentials.invalidate().await;
            let fresh = self.credentials.credential(true).await?;
            let retry = self.dispatch(&request, &fresh).await?;
            return Self::settle(retry).await;
        }

        Self::settle(response).await
    }

    /// Send one attempt with the credential attached as a bearer header
    async fn dispatch(
        &self,
        request: &RequestBuilder,
        credential: &Credential,
    ) -> Result<Response, OperationFailure> {
        // JSON and query payloads are buffered, so try_clone only fails for
        // streaming bodies, which these operations never use
        let attempt = request.try_clone().ok_or_else(OperationFailure::transport)?;
        attempt
            .bearer_auth(credential.as_str())
            .send()
            .await
            .map_err(|e| {
                warn!("CRM request failed: {}", e);
                OperationFailure::transport()
            })
    }

    /// Normalize a response into the operation outcome.
    ///
    /// Success statuses parse the body as JSON; an unreadable body on a
    /// success status is its own failure, distinct from a rejection. Other
    /// statuses produce a failure built from the status, the `x-request-id`
    /// header, and a best-effort message from the body.
    async fn settle<T: DeserializeOwned>(response: Response) -> OperationOutcome<T> {
        let status = response.status();

        if status.is_success() {
            let status = status.as_u16();
            return response.json::<T>().await.map_err(|e| {
                warn!("CRM returned success status {} with unusable body", status);
                OperationFailure {
                    status,
                    message: format!("unusable response body: {e}"),
                    correlation_id: None,
                }
            });
        }

        let correlation_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let status = status.as_u16();
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());

        warn!(status, ?correlation_id, "CRM rejected request: {}", message);
        Err(OperationFailure {
            status,
            message,
            correlation_id,
        })
    }
}
