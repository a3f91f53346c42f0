use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, AuthError};
use crate::config::{Config, SessionBackend};

use super::credentials::KeyringStore;
use super::store::{FileStore, SessionStore};

/// Storage slot holding the bearer token
pub const TOKEN_KEY: &str = "quadrobobr-admin.token";

/// Storage slot holding the JSON-serialized admin profile
pub const IDENTITY_KEY: &str = "quadrobobr-admin.admin";

/// Profile of the signed-in admin, kept for display only.
///
/// Fields the console does not know about are preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Identity {
    /// "First Last", falling back to the email when no name is set.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}

/// Published to subscribers whenever the stored pair changes.
///
/// `SignedIn(None)` only arises when a token is stored but its profile slot
/// is unreadable.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    SignedIn(Option<Identity>),
    SignedOut,
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionState::SignedIn(_))
    }
}

/// Owner of the persisted credential/identity pair.
///
/// Reads go to the store every time; nothing is cached in memory. `login`
/// and `logout` are the only writers.
pub struct SessionManager {
    store: Box<dyn SessionStore>,
    api: ApiClient,
    write_lock: Mutex<()>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(store: Box<dyn SessionStore>, api: ApiClient) -> Self {
        let (state_tx, _) = watch::channel(SessionState::SignedOut);
        let manager = Self {
            store,
            api,
            write_lock: Mutex::new(()),
            state_tx,
        };
        manager.state_tx.send_replace(manager.state());
        manager
    }

    /// Build the session manager described by `config`.
    pub fn open(config: &Config) -> Result<Arc<Self>> {
        let api = ApiClient::new(config.api_base_url(), config.request_timeout())?;
        let store: Box<dyn SessionStore> = match config.session_backend() {
            SessionBackend::File => Box::new(FileStore::new(config.data_dir()?)),
            SessionBackend::Keyring => Box::new(KeyringStore::new()),
        };
        debug!(base_url = %api.base_url(), backend = ?config.session_backend(), "Session manager opened");
        Ok(Arc::new(Self::new(store, api)))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_slot(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read session storage");
                None
            }
        }
    }

    /// The stored bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.read_slot(TOKEN_KEY)
    }

    /// True iff a non-empty token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.token().map(|t| !t.is_empty()).unwrap_or(false)
    }

    /// The stored admin profile. Absent whenever there is no token.
    pub fn identity(&self) -> Option<Identity> {
        if !self.is_authenticated() {
            return None;
        }
        let raw = self.read_slot(IDENTITY_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!(error = %e, "Stored identity is not valid JSON");
                None
            }
        }
    }

    /// Current state, read from storage.
    pub fn state(&self) -> SessionState {
        if self.is_authenticated() {
            SessionState::SignedIn(self.identity())
        } else {
            SessionState::SignedOut
        }
    }

    /// Receive a `SessionState` every time login or logout changes the pair.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Exchange credentials for a token and store it with the admin profile.
    ///
    /// Nothing is written unless the server accepted the credentials and
    /// returned a complete response.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let grant = match self.api.authenticate(email, password).await {
            Ok(grant) => grant,
            Err(e) => {
                warn!(email = email, error = %e, "Login failed");
                return Err(e);
            }
        };

        let identity_json = serde_json::to_string(&grant.identity_json)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        {
            let _guard = self.lock_writes();
            // Token goes last: its presence is what marks the session signed in
            self.store
                .set_all(&[
                    (IDENTITY_KEY, identity_json.as_str()),
                    (TOKEN_KEY, grant.access_token.as_str()),
                ])
                .map_err(|e| {
                    warn!(error = %e, "Failed to persist session");
                    AuthError::Storage(format!("{:#}", e))
                })?;
            self.state_tx
                .send_replace(SessionState::SignedIn(Some(grant.identity.clone())));
        }

        info!(email = %grant.identity.email, "Login successful");
        Ok(grant.identity)
    }

    /// Clear the token and profile. Safe to call when already signed out.
    pub fn logout(&self) {
        let _guard = self.lock_writes();
        self.clear_locked();
    }

    /// Clear the session only if `token` is still the stored one.
    ///
    /// A rejection that arrives after a newer login leaves that login alone.
    /// Returns true if the session was cleared.
    pub fn logout_if_token(&self, token: &str) -> bool {
        let _guard = self.lock_writes();
        if self.token().as_deref() != Some(token) {
            debug!("Rejected token is no longer current, keeping session");
            return false;
        }
        self.clear_locked();
        true
    }

    /// Caller holds `write_lock`. Publishes what storage holds afterwards,
    /// which is still signed in if the removal failed.
    fn clear_locked(&self) {
        if let Err(e) = self.store.remove_all(&[TOKEN_KEY, IDENTITY_KEY]) {
            warn!(error = %e, "Failed to clear session storage");
        }
        let state = self.state();
        let signed_out = !state.is_signed_in();
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed && signed_out {
            info!("Signed out");
        }
    }
}
