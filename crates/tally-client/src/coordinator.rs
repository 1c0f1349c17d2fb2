//! Coordinated token refresh
//!
//! At most one refresh operation runs at a time, no matter how many
//! requests discover a stale token simultaneously. Callers that arrive
//! while a refresh is in flight wait for its outcome instead of issuing
//! their own. The refresh itself runs on a spawned task, so a caller
//! giving up (timeout, dropped future) never tears down the operation
//! the others are waiting on.
//!
//! A failed refresh clears the session before any waiter observes the
//! failure. Subsequent requests see an unauthenticated client rather
//! than retrying a dead refresh token.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tally_auth::{AccessToken, SecretString, SessionStore, refresh_session};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use transport::Transport;

use crate::error::ApiError;
use crate::metrics;

type Outcome = Result<AccessToken, ApiError>;

enum RefreshState {
    Idle,
    Running { waiters: Vec<oneshot::Sender<Outcome>> },
}

pub struct RefreshCoordinator {
    inner: Arc<RefreshInner>,
}

struct RefreshInner {
    sessions: Arc<SessionStore>,
    transport: Arc<dyn Transport>,
    base_url: String,
    timeout: Duration,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(
        sessions: Arc<SessionStore>,
        transport: Arc<dyn Transport>,
        base_url: String,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(RefreshInner {
                sessions,
                transport,
                base_url,
                timeout,
                state: Mutex::new(RefreshState::Idle),
            }),
        }
    }

    /// Obtain a fresh access token, joining an in-flight refresh if one
    /// is already running.
    pub async fn acquire(&self) -> Outcome {
        let (tx, rx) = oneshot::channel();

        // Test-and-set must happen in one critical section so exactly one
        // caller becomes the leader. Everyone registers as a waiter,
        // leader included.
        let leader = {
            let mut state = self.inner.guard();
            match &mut *state {
                RefreshState::Running { waiters } => {
                    waiters.push(tx);
                    false
                }
                RefreshState::Idle => {
                    *state = RefreshState::Running { waiters: vec![tx] };
                    true
                }
            }
        };

        if leader {
            debug!("starting coordinated token refresh");
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                let outcome = inner.run_refresh().await;
                inner.settle(outcome);
            });
        } else {
            debug!("joining in-flight token refresh");
        }

        match rx.await {
            Ok(outcome) => outcome,
            // The refresh task always settles its waiters; losing the
            // sender means the runtime is shutting down.
            Err(_) => Err(ApiError::Network {
                message: "token refresh interrupted by shutdown".to_string(),
            }),
        }
    }
}

impl RefreshInner {
    fn guard(&self) -> MutexGuard<'_, RefreshState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run_refresh(&self) -> Outcome {
        let Some(refresh) = self.sessions.refresh_token().await else {
            warn!("refresh required but no refresh token held, clearing session");
            if let Err(err) = self.sessions.clear().await {
                warn!(error = %err, "failed to clear session in secure store");
            }
            metrics::record_refresh("unrecoverable");
            return Err(ApiError::Unrecoverable {
                code: Some("refresh_token_missing".to_string()),
                message: "no refresh token held; sign in again".to_string(),
            });
        };

        let grant = refresh_session(
            self.transport.as_ref(),
            &self.base_url,
            refresh.expose(),
            self.timeout,
        )
        .await;

        match grant {
            Ok(grant) => {
                let access = AccessToken::new(grant.token);
                let rotated = grant.refresh_token.map(SecretString::new);
                if let Err(err) = self.sessions.apply_refresh(access.clone(), rotated).await {
                    warn!(error = %err, "refreshed session could not be persisted");
                }
                info!("token refresh succeeded");
                metrics::record_refresh("success");
                Ok(access)
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed, clearing session");
                if let Err(clear_err) = self.sessions.clear().await {
                    warn!(error = %clear_err, "failed to clear session in secure store");
                }
                metrics::record_refresh("failure");
                Err(refresh_failure(err))
            }
        }
    }

    /// Hand the outcome to every registered waiter and return to idle.
    fn settle(&self, outcome: Outcome) {
        let waiters = {
            let mut state = self.guard();
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Running { waiters } => waiters,
                RefreshState::Idle => Vec::new(),
            }
        };
        debug!(waiters = waiters.len(), "token refresh settled");
        for waiter in waiters {
            // A waiter that stopped listening doesn't affect the rest.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Map a refresh endpoint failure into the public taxonomy.
fn refresh_failure(err: tally_auth::Error) -> ApiError {
    match err {
        tally_auth::Error::RefreshRejected(message) => ApiError::Unrecoverable {
            code: Some("refresh_rejected".to_string()),
            message,
        },
        tally_auth::Error::Http(message) => ApiError::Network { message },
        tally_auth::Error::Endpoint { status, message } => ApiError::Server { status, message },
        tally_auth::Error::Io(message) | tally_auth::Error::Parse(message) => {
            ApiError::Unrecoverable {
                code: Some("store".to_string()),
                message,
            }
        }
    }
}
