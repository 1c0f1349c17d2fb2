//! The live session pair
//!
//! `SessionStore` owns the one piece of mutable shared state in the whole
//! client: the (access, refresh) token pair. Every mutation happens under a
//! single tokio Mutex and persists through the backing `TokenStore` before
//! the lock is released, so readers never observe a half-updated pair and
//! memory never silently diverges from the secure store.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::secret::SecretString;
use crate::store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenStore};
use crate::token::AccessToken;

/// The held credential pair.
///
/// Access may be absent (never logged in, or cleared). A session without a
/// refresh token cannot be repaired when the access token dies.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub access: Option<AccessToken>,
    pub refresh: Option<SecretString>,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

/// Serialized owner of the session pair.
pub struct SessionStore {
    store: Arc<dyn TokenStore>,
    state: Mutex<Session>,
}

impl SessionStore {
    /// Hydrate the session from the two secure-store keys.
    pub async fn load(store: Arc<dyn TokenStore>) -> Result<Self> {
        let access = store.get(ACCESS_TOKEN_KEY).await?.map(AccessToken::new);
        let refresh = store.get(REFRESH_TOKEN_KEY).await?.map(SecretString::new);
        let session = Session { access, refresh };
        debug!(
            authenticated = session.access.is_some(),
            "session hydrated from secure store"
        );
        Ok(Self {
            store,
            state: Mutex::new(session),
        })
    }

    /// Snapshot of the current pair.
    pub async fn session(&self) -> Session {
        self.state.lock().await.clone()
    }

    /// The held access token, if any.
    pub async fn access_token(&self) -> Option<AccessToken> {
        self.state.lock().await.access.clone()
    }

    /// The held refresh token, if any.
    pub async fn refresh_token(&self) -> Option<SecretString> {
        self.state.lock().await.refresh.clone()
    }

    /// Whether a bearer credential is currently held.
    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.access.is_some()
    }

    /// Install a fresh pair after login or register.
    ///
    /// Memory is updated first so the session is live for this process even
    /// if keychain persistence fails; the store error still surfaces so the
    /// caller knows the session won't survive a restart.
    pub async fn install(&self, access: &str, refresh: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.access = Some(AccessToken::new(access));
        state.refresh = Some(SecretString::new(refresh));
        info!("session installed");
        self.store.set(ACCESS_TOKEN_KEY, access.to_owned()).await?;
        self.store.set(REFRESH_TOKEN_KEY, refresh.to_owned()).await
    }

    /// Adopt a refresh grant: replace the access token and, when the server
    /// rotated it, the refresh token.
    ///
    /// Only the refresh coordinator calls this, inside its critical
    /// section. Memory always adopts the grant; discarding a completed
    /// rotation because the store write failed would strand the session
    /// permanently.
    pub async fn apply_refresh(
        &self,
        access: AccessToken,
        rotated_refresh: Option<SecretString>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let access_value = access.value().to_owned();
        state.access = Some(access);
        let mut persist = self.store.set(ACCESS_TOKEN_KEY, access_value).await;

        if let Some(refresh) = rotated_refresh {
            let refresh_value = refresh.expose().to_owned();
            state.refresh = Some(refresh);
            let rotated = self.store.set(REFRESH_TOKEN_KEY, refresh_value).await;
            persist = persist.and(rotated);
        }

        persist
    }

    /// Drop the pair from memory and the secure store.
    ///
    /// Memory is cleared before the store writes so callers observe a dead
    /// session even when the store errors.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = Session::default();
        info!("session cleared");
        self.store.clear(ACCESS_TOKEN_KEY).await?;
        self.store.clear(REFRESH_TOKEN_KEY).await
    }
}
