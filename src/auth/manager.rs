use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::login;
use super::types::{Credential, LoginSettings};
use crate::error::CrmError;

/// One shareable login attempt. Every concurrent waiter clones and polls
/// the same underlying request instead of issuing its own.
type SharedLogin = Shared<BoxFuture<'static, Result<Credential, CrmError>>>;

/// State guarded by the manager mutex
#[derive(Default)]
struct Slot {
    /// Credential from the last successful login
    cached: Option<Credential>,

    /// Login currently in flight, if any
    inflight: Option<SharedLogin>,
}

/// Credential lifecycle manager
/// Caches the bearer token and collapses concurrent logins into one call
pub struct CredentialManager {
    /// Cached credential and in-flight login, behind one lock
    slot: Mutex<Slot>,

    /// HTTP client for login requests
    client: Client,

    /// Endpoint and account identity used for every login
    settings: Arc<LoginSettings>,
}

impl CredentialManager {
    /// Create a manager with an empty cache; the first `credential` call logs in
    pub fn new(client: Client, settings: LoginSettings) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            client,
            settings: Arc::new(settings),
        }
    }

    /// Create a manager with a pre-seeded cached credential
    /// Available in test builds and integration tests
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(client: Client, settings: LoginSettings, token: &str) -> Self {
        Self {
            slot: Mutex::new(Slot {
                cached: Some(Credential::new(token.to_string())),
                inflight: None,
            }),
            client,
            settings: Arc::new(settings),
        }
    }

    /// Get a credential, logging in if none is cached.
    ///
    /// With `force_refresh` the cache is bypassed and a new login is
    /// performed. Either way, if a login is already in flight the caller
    /// joins it rather than starting another.
    pub async fn credential(&self, force_refresh: bool) -> Result<Credential, CrmError> {
        let pending = {
            let mut slot = self.slot.lock().await;

            if !force_refresh {
                if let Some(cached) = slot.cached.clone() {
                    return Ok(cached);
                }
            }

            match slot.inflight.clone() {
                Some(pending) => {
                    debug!("Joining login already in flight");
                    pending
                }
                None => {
                    debug!("Starting CRM login");
                    let pending = login::login(self.client.clone(), Arc::clone(&self.settings))
                        .boxed()
                        .shared();
                    slot.inflight = Some(pending.clone());
                    pending
                }
            }
        };

        // Await outside the lock so waiters can pile onto the same attempt
        let outcome = pending.clone().await;
        self.settle(&pending, &outcome).await;
        outcome
    }

    /// Drop the cached credential so the next call performs a fresh login.
    /// A login already in flight is left to finish.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        if slot.cached.take().is_some() {
            debug!("Dropped cached CRM credential");
        }
    }

    /// Publish the outcome of a finished login: cache on success, clear the
    /// in-flight marker either way. Only the attempt still registered in the
    /// slot is settled, so a slow waiter from an older attempt cannot
    /// clobber a newer one.
    async fn settle(&self, pending: &SharedLogin, outcome: &Result<Credential, CrmError>) {
        let mut slot = self.slot.lock().await;

        let same_attempt = slot
            .inflight
            .as_ref()
            .map(|current| current.ptr_eq(pending))
            .unwrap_or(false);
        if !same_attempt {
            return;
        }

        slot.inflight = None;
        match outcome {
            Ok(credential) => {
                slot.cached = Some(credential.clone());
            }
            Err(e) => {
                // A failed login never leaves a stale credential behind
                warn!("CRM login failed: {}", e);
                slot.cached = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(base_url: &str) -> LoginSettings {
        LoginSettings {
            base_url: base_url.to_string(),
            email: "agent@example.com".to_string(),
            password: "hunter2".to_string(),
            device_name: "krayin-client".to_string(),
        }
    }

    /// Login mock whose body only arrives after `delay`, keeping the
    /// attempt in flight long enough for other callers to join it
    async fn slow_login_mock(server: &mut mockito::Server, body: &'static str) -> mockito::Mock {
        server
            .mock("POST", "/api/v1/login")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_chunked_body(move |w| {
                std::thread::sleep(Duration::from_millis(300));
                w.write_all(body.as_bytes())
            })
            .expect(1)
            .create_async()
            .await
    }

    /// Poll until the server has seen the login request land
    async fn wait_until_matched(mock: &mockito::Mock) {
        while !mock.matched_async().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_cached_credential_skips_login() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/login")
            .expect(0)
            .create_async()
            .await;

        let manager =
            CredentialManager::new_for_testing(Client::new(), settings(&server.url()), "seeded");
        let credential = manager.credential(false).await.unwrap();

        assert_eq!(credential.as_str(), "seeded");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_outcome_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/login")
            .with_status(200)
            .with_body(r#"{"token":"t0"}"#)
            .expect(1)
            .create_async()
            .await;

        let manager = CredentialManager::new(Client::new(), settings(&server.url()));
        assert_eq!(manager.credential(false).await.unwrap().as_str(), "t0");
        // Second call is served from the cache
        assert_eq!(manager.credential(false).await.unwrap().as_str(), "t0");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_force_refresh_replaces_cached_credential() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/login")
            .with_status(200)
            .with_body(r#"{"token":"fresh"}"#)
            .expect(1)
            .create_async()
            .await;

        let manager =
            CredentialManager::new_for_testing(Client::new(), settings(&server.url()), "stale");
        assert_eq!(manager.credential(true).await.unwrap().as_str(), "fresh");
        assert_eq!(manager.credential(false).await.unwrap().as_str(), "fresh");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_login() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/login")
            .with_status(200)
            .with_body(r#"{"token":"renewed"}"#)
            .expect(1)
            .create_async()
            .await;

        let manager =
            CredentialManager::new_for_testing(Client::new(), settings(&server.url()), "seeded");
        manager.invalidate().await;
        assert_eq!(manager.credential(false).await.unwrap().as_str(), "renewed");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_login() {
        let mut server = mockito::Server::new_async().await;
        let mock = slow_login_mock(&mut server, r#"{"token":"shared"}"#).await;

        let manager = Arc::new(CredentialManager::new(Client::new(), settings(&server.url())));

        let leader = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.credential(false).await })
        };
        // Followers only start once the leader's request has hit the server
        wait_until_matched(&mock).await;

        let mut followers = Vec::new();
        for _ in 0..4 {
            let manager = Arc::clone(&manager);
            followers.push(tokio::spawn(async move { manager.credential(false).await }));
        }

        assert_eq!(leader.await.unwrap().unwrap().as_str(), "shared");
        for follower in followers {
            assert_eq!(follower.await.unwrap().unwrap().as_str(), "shared");
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_login_is_broadcast_and_not_cached() {
        let mut server = mockito::Server::new_async().await;
        // 200 with an unusable body, delayed so a follower can join
        let failing = slow_login_mock(&mut server, r#"{}"#).await;

        let manager = Arc::new(CredentialManager::new(Client::new(), settings(&server.url())));

        let leader = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.credential(false).await })
        };
        wait_until_matched(&failing).await;
        let follower = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.credential(false).await })
        };

        let leader_err = leader.await.unwrap().unwrap_err();
        let follower_err = follower.await.unwrap().unwrap_err();
        assert!(matches!(
            leader_err,
            CrmError::MalformedResponse { status: 200, .. }
        ));
        assert_eq!(leader_err, follower_err);
        failing.assert_async().await;

        // The failure left no credential behind; the next call logs in again
        let recovery = server
            .mock("POST", "/api/v1/login")
            .with_status(200)
            .with_body(r#"{"token":"after-failure"}"#)
            .expect(1)
            .create_async()
            .await;
        assert_eq!(
            manager.credential(false).await.unwrap().as_str(),
            "after-failure"
        );
        recovery.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/login")
            .with_status(401)
            .with_body(r#"{"message":"bad credentials"}"#)
            .create_async()
            .await;

        let manager = CredentialManager::new(Client::new(), settings(&server.url()));
        let err = manager.credential(false).await.unwrap_err();
        assert_eq!(err, CrmError::AuthenticationRejected { status: 401 });
    }
}
