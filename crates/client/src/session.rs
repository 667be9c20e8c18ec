//! Session store: sign-in, registration, sign-out and session restoration.
//!
//! The active identity lives in an [`ActiveIdentity`] cell shared with the
//! gateway. Only [`SessionStore`] writes to it; every request reads the latest
//! committed value. The identity is persisted under two keys (`token` and
//! `user`) that are always written and cleared together.

use std::sync::{Arc, PoisonError, RwLock};

use mercato_core::{Email, UserId};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument, warn};

use crate::error::{ClientError, ValidationError};
use crate::gateway::wire::{AuthResponse, LoginRequest, RegisterRequest};
use crate::gateway::{Gateway, GatewayError};
use crate::models::Identity;
use crate::status::{StatusCell, StoreStatus};
use crate::storage::{KeyValueStore, keys};

// =============================================================================
// ActiveIdentity
// =============================================================================

/// Shared cell holding the signed-in identity, if any.
///
/// Cloning shares the cell. Reads never block on network activity because
/// the lock is only held for the duration of a copy.
#[derive(Clone, Default)]
pub struct ActiveIdentity(Arc<RwLock<Option<Identity>>>);

impl ActiveIdentity {
    /// The signed-in identity.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Bearer token of the signed-in identity.
    #[must_use]
    pub fn bearer(&self) -> Option<SecretString> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|identity| identity.token.clone())
    }

    /// Whether someone is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.0.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Whether the signed-in identity is an admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(Identity::is_admin)
    }

    fn replace(&self, identity: Option<Identity>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = identity;
    }
}

// =============================================================================
// SessionStore
// =============================================================================

/// Owns the signed-in identity and its durable copy.
pub struct SessionStore {
    identity: ActiveIdentity,
    gateway: Gateway,
    storage: Arc<dyn KeyValueStore>,
    status: StatusCell,
}

impl SessionStore {
    /// Create a store. Nothing is read from storage until
    /// [`restore_session`](Self::restore_session) is called.
    #[must_use]
    pub fn new(identity: ActiveIdentity, gateway: Gateway, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            identity,
            gateway,
            storage,
            status: StatusCell::default(),
        }
    }

    /// The signed-in identity.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.identity.current()
    }

    /// Shared identity cell, for readers such as the gateway.
    #[must_use]
    pub const fn active(&self) -> &ActiveIdentity {
        &self.identity
    }

    /// Progress and error of the last operation.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        self.status.snapshot()
    }

    /// Dismiss the last error, e.g. when the login form is edited.
    pub fn clear_error(&self) {
        self.status.clear_error();
    }

    /// Create an account and sign in as it.
    ///
    /// On failure the previously active identity, if any, is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for blank or malformed input,
    /// `ClientError::Auth` when the backend rejects the registration, and
    /// `ClientError::Transport` when it cannot be reached.
    #[instrument(skip(self, username, email, password), fields(username = %username))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ClientError> {
        self.status
            .track(async {
                let username = required("username", username)?;
                let email = Email::parse(email).map_err(ValidationError::from)?;
                let password = required("password", password.expose_secret())?;

                let request = RegisterRequest {
                    username,
                    email: email.as_str(),
                    password,
                };
                let response: AuthResponse = self
                    .gateway
                    .post(&["users", "register"], &request)
                    .await
                    .map_err(|e| auth_failure(e, "Registration failed"))?;

                Ok(self.activate(response.into()))
            })
            .await
    }

    /// Sign in with an email or a username.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for blank input, `ClientError::Auth`
    /// for rejected credentials, and `ClientError::Transport` when the backend
    /// cannot be reached. The previous identity is kept on failure.
    #[instrument(skip(self, email_or_username, password), fields(identifier = %email_or_username))]
    pub async fn login(
        &self,
        email_or_username: &str,
        password: &SecretString,
    ) -> Result<Identity, ClientError> {
        self.status
            .track(async {
                let identifier = required("email or username", email_or_username)?;
                let password = required("password", password.expose_secret())?;

                let response: AuthResponse = self
                    .gateway
                    .post(
                        &["users", "login"],
                        &LoginRequest::new(identifier, password),
                    )
                    .await
                    .map_err(|e| auth_failure(e, "Login failed"))?;

                Ok(self.activate(response.into()))
            })
            .await
    }

    /// Sign out `identity_id`.
    ///
    /// The backend is notified first, but local state is cleared whatever the
    /// outcome so the client can never be stuck signed in to an unreachable
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns the notification failure after local state has been cleared.
    #[instrument(skip(self, identity_id), fields(user_id = %identity_id))]
    pub async fn logout(&self, identity_id: &UserId) -> Result<(), ClientError> {
        self.status
            .track(async {
                let notified = self
                    .gateway
                    .execute::<()>(Method::POST, &["users", identity_id.as_str(), "logout"], None)
                    .await;

                self.clear_session();

                notified.map_err(|e| {
                    warn!(error = %e, "logout notification failed; local session cleared anyway");
                    ClientError::from(e)
                })
            })
            .await
    }

    /// Sign out whoever is signed in. Does nothing when anonymous.
    ///
    /// # Errors
    ///
    /// See [`logout`](Self::logout).
    pub async fn logout_current(&self) -> Result<(), ClientError> {
        match self.identity.current() {
            Some(identity) => self.logout(&identity.id).await,
            None => Ok(()),
        }
    }

    /// Drop the active identity and its durable copy without contacting the
    /// backend.
    pub fn clear_session(&self) {
        self.identity.replace(None);
        for key in [keys::TOKEN, keys::USER] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "failed to clear persisted session");
            }
        }
        info!("session cleared");
    }

    /// Reactivate a persisted identity without any network call.
    ///
    /// Token validity is not checked here; an expired token surfaces later as
    /// an authorization error on the next privileged request.
    pub fn restore_session(&self) -> Option<Identity> {
        let stored = match self.storage.get(keys::USER) {
            Ok(stored) => stored?,
            Err(e) => {
                warn!(error = %e, "failed to read persisted session");
                return None;
            }
        };

        match serde_json::from_str::<Identity>(&stored) {
            Ok(identity) => {
                debug!(user_id = %identity.id, admin = identity.is_admin(), "session restored");
                self.identity.replace(Some(identity.clone()));
                Some(identity)
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable persisted session");
                self.clear_session();
                None
            }
        }
    }

    /// Persist and activate a freshly issued identity.
    fn activate(&self, identity: Identity) -> Identity {
        if let Err(e) = self.persist(&identity) {
            warn!(error = %e, "failed to persist session; it will not survive a restart");
        }
        self.identity.replace(Some(identity.clone()));
        info!(user_id = %identity.id, admin = identity.is_admin(), "signed in");
        identity
    }

    /// Write `user` and `token` as a pair. If either write fails, both keys
    /// are removed so no half-written session survives a restart.
    fn persist(&self, identity: &Identity) -> Result<(), ClientError> {
        let serialized = serde_json::to_string(identity)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        let written = self
            .storage
            .set(keys::USER, &serialized)
            .and_then(|()| self.storage.set(keys::TOKEN, identity.token.expose_secret()));
        if let Err(e) = written {
            for key in [keys::TOKEN, keys::USER] {
                if let Err(cleanup) = self.storage.remove(key) {
                    warn!(key, error = %cleanup, "failed to roll back partial session write");
                }
            }
            return Err(e.into());
        }
        Ok(())
    }
}

/// Trim `value` and reject it if blank.
fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed)
    }
}

/// Map a failed login/registration to the auth error taxonomy.
fn auth_failure(err: GatewayError, fallback: &str) -> ClientError {
    if err.is_transport() {
        return ClientError::from(err);
    }
    ClientError::Auth(
        err.backend_message()
            .map_or_else(|| fallback.to_string(), str::to_string),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mercato_core::Role;
    use url::Url;

    use super::*;
    use crate::config::ClientConfig;
    use crate::storage::{MemoryStore, StorageError};

    /// A store pointed at a port nothing listens on.
    fn offline_store(storage: Arc<dyn KeyValueStore>) -> SessionStore {
        let identity = ActiveIdentity::default();
        let config = ClientConfig::for_base_url(Url::parse("http://127.0.0.1:9/api").unwrap());
        let gateway = Gateway::new(&config, identity.clone()).unwrap();
        SessionStore::new(identity, gateway, storage)
    }

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::new("u1"),
            username: "ada".into(),
            email: "ada@example.com".into(),
            token: SecretString::from("tok"),
            role,
        }
    }

    #[test]
    fn test_restore_without_persisted_identity() {
        let store = offline_store(Arc::new(MemoryStore::new()));
        assert!(store.restore_session().is_none());
        assert!(store.identity().is_none());
    }

    #[test]
    fn test_restore_admin_identity() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(keys::USER, &serde_json::to_string(&identity(Role::Admin)).unwrap())
            .unwrap();

        let store = offline_store(storage);
        let restored = store.restore_session().unwrap();
        assert!(restored.is_admin());
        assert!(store.active().is_admin());
        assert_eq!(store.active().bearer().unwrap().expose_secret(), "tok");
    }

    #[test]
    fn test_restore_discards_corrupt_identity() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::USER, "{not json").unwrap();
        storage.set(keys::TOKEN, "tok").unwrap();

        let store = offline_store(storage.clone());
        assert!(store.restore_session().is_none());
        assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
    }

    /// Rejects writes to one key and delegates everything else.
    struct RejectingStore {
        inner: MemoryStore,
        rejected: &'static str,
    }

    impl KeyValueStore for RejectingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == self.rejected {
                return Err(StorageError::Io {
                    key: key.to_string(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_failed_persist_leaves_no_half_session() {
        for rejected in [keys::USER, keys::TOKEN] {
            let storage = Arc::new(RejectingStore {
                inner: MemoryStore::new(),
                rejected,
            });
            storage.inner.set(keys::TOKEN, "stale").unwrap();
            storage.inner.set(keys::USER, "{}").unwrap();

            let store = offline_store(storage.clone());
            store.activate(identity(Role::Customer));

            assert_eq!(storage.get(keys::TOKEN).unwrap(), None, "{rejected} rejected");
            assert_eq!(storage.get(keys::USER).unwrap(), None, "{rejected} rejected");
            // The in-memory session still works for this process.
            assert!(store.active().is_authenticated());
        }
    }

    #[test]
    fn test_activate_writes_token_and_user_together() {
        let storage = Arc::new(MemoryStore::new());
        let store = offline_store(storage.clone());

        store.activate(identity(Role::Admin));

        assert_eq!(storage.get(keys::TOKEN).unwrap().as_deref(), Some("tok"));
        let persisted: Identity =
            serde_json::from_str(&storage.get(keys::USER).unwrap().unwrap()).unwrap();
        assert!(persisted.is_admin());
    }

    #[tokio::test]
    async fn test_logout_clears_state_when_backend_unreachable() {
        let storage = Arc::new(MemoryStore::new());
        let store = offline_store(storage.clone());
        store.activate(identity(Role::Customer));
        assert!(storage.get(keys::USER).unwrap().is_some());

        let result = store.logout(&UserId::new("u1")).await;

        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert!(store.identity().is_none());
        assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
        assert_eq!(storage.get(keys::USER).unwrap(), None);
        assert!(store.status().error.is_some());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_previous_identity() {
        let store = offline_store(Arc::new(MemoryStore::new()));
        store.activate(identity(Role::Admin));

        let result = store
            .login("someone@example.com", &SecretString::from("pw"))
            .await;

        assert!(result.is_err());
        assert_eq!(store.identity().unwrap().id.as_str(), "u1");
    }

    #[tokio::test]
    async fn test_blank_credentials_never_reach_network() {
        let store = offline_store(Arc::new(MemoryStore::new()));
        let err = store
            .login("   ", &SecretString::from("pw"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::Validation(ValidationError::MissingField("email or username"))
        );

        let err = store
            .register("ada", "not-an-email", &SecretString::from("pw"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
