// Authentication types

use std::fmt;

use serde::Deserialize;

/// Bearer token issued by the CRM login endpoint.
///
/// Opaque to everything except the Authorization header; carries no
/// client-side expiry because the login response has none. Expiry is
/// discovered reactively through a 401.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub(crate) fn new(token: String) -> Self {
        Self(token)
    }

    /// Raw token value, used to build the `Authorization: Bearer` header
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print whole tokens, only a short preview
        let preview: String = self.0.chars().take(8).collect();
        write!(f, "Credential({preview}..)")
    }
}

/// Everything the login step needs: endpoint plus account identity.
#[derive(Clone)]
pub struct LoginSettings {
    /// CRM base URL without a trailing slash
    pub base_url: String,
    pub email: String,
    pub password: String,
    pub device_name: String,
}

/// Login endpoint response body
#[derive(Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let credential = Credential::new("super-secret-token-value".to_string());
        let rendered = format!("{credential:?}");
        assert_eq!(rendered, "Credential(super-se..)");
        assert!(!rendered.contains("secret-token-value"));
    }

    #[test]
    fn test_debug_handles_short_tokens() {
        let credential = Credential::new("abc".to_string());
        assert_eq!(format!("{credential:?}"), "Credential(abc..)");
    }
}
