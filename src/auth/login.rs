// Login call against the CRM authentication endpoint

use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, warn};

use super::types::{Credential, LoginResponse, LoginSettings};
use crate::error::CrmError;

/// Full URL of the login endpoint
fn login_url(base_url: &str) -> String {
    format!("{base_url}/api/v1/login")
}

/// Perform a login call and return the bearer token.
///
/// Classification:
/// - transport failures become `CrmError::Connectivity`
/// - any non-2xx status becomes `CrmError::AuthenticationRejected`
/// - a 2xx body without a usable token becomes `CrmError::MalformedResponse`
pub(super) async fn login(
    client: Client,
    settings: Arc<LoginSettings>,
) -> Result<Credential, CrmError> {
    let url = login_url(&settings.base_url);
    debug!("Logging in to {} as {}", url, settings.email);

    let form = [
        ("email", settings.email.as_str()),
        ("password", settings.password.as_str()),
        ("device_name", settings.device_name.as_str()),
    ];

    let response = client.post(&url).form(&form).send().await.map_err(|e| {
        warn!("Login request failed: {}", e);
        CrmError::Connectivity(e.to_string())
    })?;

    let status = response.status().as_u16();
    if !response.status().is_success() {
        warn!("CRM rejected login with status {}", status);
        return Err(CrmError::AuthenticationRejected { status });
    }

    let body: LoginResponse =
        response
            .json()
            .await
            .map_err(|e| CrmError::MalformedResponse {
                status,
                detail: format!("login body is not valid JSON: {e}"),
            })?;

    match body.token {
        Some(token) if !token.is_empty() => {
            debug!("Login succeeded, received bearer token");
            Ok(Credential::new(token))
        }
        _ => Err(CrmError::MalformedResponse {
            status,
            detail: "login body carries no token".to_string(),
        }),
    }
}
