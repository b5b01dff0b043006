// Error handling module
// Defines the CRM error taxonomy and the normalized operation outcome

use serde::Serialize;
use thiserror::Error;

/// Errors raised while talking to the Krayin CRM.
///
/// Cloneable so a single login failure can be handed to every task waiting on
/// the same in-flight refresh.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrmError {
    /// The endpoint could not be reached (DNS, connect, timeout)
    #[error("CRM endpoint unreachable: {0}")]
    Connectivity(String),

    /// The login endpoint rejected the configured account
    #[error("CRM login failed with status {status}")]
    AuthenticationRejected { status: u16 },

    /// Success status but the body was not usable
    #[error("unusable CRM response (status {status}): {detail}")]
    MalformedResponse { status: u16, detail: String },

    /// Non-success status with a provider-supplied message
    #[error("CRM error {status}: {message}")]
    Provider {
        status: u16,
        message: String,
        correlation_id: Option<String>,
    },
}

/// Normalized failure shape handed to the presentation layer.
///
/// `status == 0` is a transport-level failure (the request never produced an
/// HTTP response). A `status` in the 2xx range means the server accepted the
/// request but the payload could not be decoded. Anything else is an
/// HTTP-level rejection. `correlation_id` carries the provider's
/// `x-request-id` header when one was present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationFailure {
    pub status: u16,
    pub message: String,
    pub correlation_id: Option<String>,
}

impl OperationFailure {
    /// Failure for a request that never reached the server
    pub(crate) fn transport() -> Self {
        Self {
            status: 0,
            message: "network error".to_string(),
            correlation_id: None,
        }
    }

    /// The request never produced an HTTP response
    #[allow(dead_code)]
    pub fn is_transport(&self) -> bool {
        self.status == 0
    }

    /// The server said yes but the payload was unreadable
    #[allow(dead_code)]
    pub fn is_malformed_payload(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<CrmError> for OperationFailure {
    fn from(err: CrmError) -> Self {
        let message = err.to_string();
        match err {
            // Transport detail is logged at the call site, not surfaced
            CrmError::Connectivity(_) => Self::transport(),
            CrmError::AuthenticationRejected { status } => Self {
                status,
                message,
                correlation_id: None,
            },
            CrmError::MalformedResponse { status, .. } => Self {
                status,
                message,
                correlation_id: None,
            },
            CrmError::Provider {
                status,
                message,
                correlation_id,
            } => Self {
                status,
                message,
                correlation_id,
            },
        }
    }
}

/// Result type alias for CRM operations
pub type OperationOutcome<T> = std::result::Result<T, OperationFailure>;
