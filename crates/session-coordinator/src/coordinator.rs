//! Single-flight token refresh
//!
//! Two states:
//!
//! - `Idle`: no refresh running, no one waiting
//! - `Refreshing`: one refresh call in flight, plus the ordered queue of
//!   callers waiting for its result
//!
//! Transitions:
//! - Idle → Refreshing: first expired caller; the refresh is spawned
//! - Refreshing → Refreshing: later expired callers join the queue
//! - Refreshing → Idle: refresh settled (success, failure, timeout or the
//!   refresh task dying); the queue is drained in arrival order
//!
//! The queue lives inside the `Refreshing` variant, so an `Idle` coordinator
//! cannot hold waiters. The start-or-join decision is made under a
//! synchronous mutex with no `.await` while it is held, which is what makes
//! overlapping failures collapse into one refresh call.
//!
//! The refresh runs on its own task rather than in the first caller's
//! future: if that caller is cancelled, everyone queued behind it still gets
//! an answer.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use session_auth::{AccessToken, REFRESH_PATH, TokenStore};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::RefreshError;
use crate::terminator::{LogoutReason, SessionTerminator};

/// Default upper bound on one refresh call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Performs the actual refresh call.
///
/// Uses `Pin<Box<dyn Future>>` so the coordinator can hold an
/// `Arc<dyn TokenRefresher>`.
pub trait TokenRefresher: Send + Sync {
    fn refresh(&self) -> Pin<Box<dyn Future<Output = Result<AccessToken, RefreshError>> + Send + '_>>;
}

/// Refresher that calls `POST /api/auth/refresh` with the client's cookie jar.
pub struct HttpRefresher {
    client: reqwest::Client,
    url: String,
}

impl HttpRefresher {
    /// `client` must be the same cookie-enabled client that performed login,
    /// otherwise it holds no refresh cookie.
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), REFRESH_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TokenRefresher for HttpRefresher {
    fn refresh(&self) -> Pin<Box<dyn Future<Output = Result<AccessToken, RefreshError>> + Send + '_>> {
        Box::pin(async move {
            session_auth::refresh_access_token(&self.client, &self.url)
                .await
                .map_err(RefreshError::from)
        })
    }
}

/// Observable coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

impl RefreshState {
    pub fn label(&self) -> &'static str {
        match self {
            RefreshState::Idle => "idle",
            RefreshState::Refreshing => "refreshing",
        }
    }
}

type Waiter = oneshot::Sender<Result<AccessToken, RefreshError>>;

enum Phase {
    Idle,
    Refreshing { waiters: Vec<Waiter> },
}

struct Inner {
    phase: Mutex<Phase>,
    store: Arc<TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    terminator: Arc<SessionTerminator>,
    timeout: Duration,
}

/// Collapses concurrent token-expiry failures into one refresh call.
///
/// Cheap to clone; clones share state. Create one per session.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<TokenStore>,
        refresher: Arc<dyn TokenRefresher>,
        terminator: Arc<SessionTerminator>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                phase: Mutex::new(Phase::Idle),
                store,
                refresher,
                terminator,
                timeout: DEFAULT_REFRESH_TIMEOUT,
            }),
        }
    }

    /// Override the refresh timeout. Call before the coordinator is shared.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.timeout = timeout;
                Self {
                    inner: Arc::new(inner),
                }
            }
            Err(inner) => {
                warn!("refresh timeout changed after coordinator was shared, ignoring");
                Self { inner }
            }
        }
    }

    /// Obtain a fresh token after a request failed with an expired token.
    ///
    /// `stale` is the token the failed request was sent with. If the store
    /// already holds a different token, a refresh finished while that request
    /// was in flight, and the current token is returned without another
    /// refresh call. Otherwise the caller either starts the refresh or queues
    /// behind the one in flight.
    ///
    /// On failure the token has already been cleared when this returns,
    /// unless the refresh task was cancelled without finishing.
    pub async fn handle_expired_token(
        &self,
        stale: Option<&AccessToken>,
    ) -> Result<AccessToken, RefreshError> {
        let receiver = {
            let mut phase = self.inner.lock_phase();

            if matches!(*phase, Phase::Idle)
                && let (Some(stale), Some(current)) = (stale, self.inner.store.get_token())
                && *stale != current
            {
                debug!("token already refreshed since request was sent, reusing it");
                crate::metrics::record_stale_replay();
                return Ok(current);
            }

            let (sender, receiver) = oneshot::channel();
            match &mut *phase {
                Phase::Refreshing { waiters } => {
                    waiters.push(sender);
                    crate::metrics::record_waiter_joined();
                    debug!(queued = waiters.len(), "refresh in flight, waiting for result");
                }
                Phase::Idle => {
                    *phase = Phase::Refreshing {
                        waiters: vec![sender],
                    };
                    info!("access token expired, starting refresh");
                    self.spawn_refresh();
                }
            }
            receiver
        };

        receiver.await.unwrap_or(Err(RefreshError::Aborted))
    }

    /// Current state of the refresh state machine.
    pub fn state(&self) -> RefreshState {
        match *self.inner.lock_phase() {
            Phase::Idle => RefreshState::Idle,
            Phase::Refreshing { .. } => RefreshState::Refreshing,
        }
    }

    /// Number of callers waiting on the in-flight refresh.
    pub fn pending(&self) -> usize {
        match &*self.inner.lock_phase() {
            Phase::Idle => 0,
            Phase::Refreshing { waiters } => waiters.len(),
        }
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.inner.store
    }

    pub fn terminator(&self) -> &Arc<SessionTerminator> {
        &self.inner.terminator
    }

    fn spawn_refresh(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut guard = SettleGuard {
                inner: Some(Arc::clone(&inner)),
            };
            let outcome = match tokio::time::timeout(inner.timeout, inner.refresher.refresh()).await {
                Ok(result) => result,
                Err(_) => Err(RefreshError::Timeout(inner.timeout)),
            };
            guard.inner = None;
            inner.settle(outcome);
        });
    }
}

impl Inner {
    fn lock_phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the refresh outcome and release every waiter.
    ///
    /// The token is updated before the state flips back to Idle, so a request
    /// failing with the old token in between still joins this round instead
    /// of starting a new refresh.
    fn settle(&self, outcome: Result<AccessToken, RefreshError>) {
        let outcome = self.apply(outcome);
        self.release(outcome);
    }

    /// Write the outcome to the session. A token that cannot be sent as a
    /// header is treated as a refresh that returned no token.
    fn apply(&self, outcome: Result<AccessToken, RefreshError>) -> Result<AccessToken, RefreshError> {
        let outcome = outcome.and_then(|token| match token.bearer_header() {
            Ok(_) => Ok(token),
            Err(e) => Err(RefreshError::MissingToken(format!(
                "refreshed token is not a valid header value: {e}"
            ))),
        });

        match &outcome {
            Ok(token) => self.store.set_token(Some(token.clone())),
            Err(err) if err.demands_logout() => {
                warn!(error = %err, "refresh rejected with logout instruction");
                self.terminator.terminate(LogoutReason::RefreshRejected);
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed, clearing session");
                self.store.set_token(None);
            }
        }
        outcome
    }

    /// Flip back to Idle and hand `outcome` to every waiter in arrival order.
    fn release(&self, outcome: Result<AccessToken, RefreshError>) {
        let waiters = match std::mem::replace(&mut *self.lock_phase(), Phase::Idle) {
            Phase::Refreshing { waiters } => waiters,
            Phase::Idle => Vec::new(),
        };

        crate::metrics::record_refresh(&outcome.as_ref().map(|_| ()));
        match &outcome {
            Ok(_) => info!(waiters = waiters.len(), "token refresh succeeded"),
            Err(_) => debug!(waiters = waiters.len(), "rejecting queued callers"),
        }

        for waiter in waiters {
            // A closed receiver means that caller was cancelled; skip it.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Settles waiters with `Aborted` if the refresh task unwinds or is dropped
/// before reaching `settle`.
///
/// A panic in the refresher counts as a failed refresh and clears the
/// session. A dropped task (runtime shutdown) says nothing about the token,
/// so the stored session is left in place.
struct SettleGuard {
    inner: Option<Arc<Inner>>,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            if std::thread::panicking() {
                warn!("refresh task panicked");
                inner.settle(Err(RefreshError::Aborted));
            } else {
                warn!("refresh task cancelled, keeping stored session");
                inner.release(Err(RefreshError::Aborted));
            }
        }
    }
}
