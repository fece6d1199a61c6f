//! Session termination
//!
//! One primitive for every way a session ends: the server forcing a logout,
//! a refresh failure that demands logout, or the user signing out. Clears the
//! token, then asks the `Navigator` to take the user to the signed-out entry
//! point.

use std::sync::Arc;

use session_auth::TokenStore;
use tracing::info;

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// A response carried `shouldLogout: true`.
    ForcedByServer,
    /// The refresh call failed and its response demanded logout.
    RefreshRejected,
    /// The user signed out.
    UserRequested,
}

impl LogoutReason {
    pub fn label(&self) -> &'static str {
        match self {
            LogoutReason::ForcedByServer => "forced_by_server",
            LogoutReason::RefreshRejected => "refresh_rejected",
            LogoutReason::UserRequested => "user_requested",
        }
    }
}

/// Moves the application to its signed-out state.
///
/// Must tolerate being called when already signed out.
pub trait Navigator: Send + Sync {
    fn navigate_to_login(&self, reason: LogoutReason);
}

impl<F> Navigator for F
where
    F: Fn(LogoutReason) + Send + Sync,
{
    fn navigate_to_login(&self, reason: LogoutReason) {
        self(reason)
    }
}

/// Navigator that only logs; for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate_to_login(&self, reason: LogoutReason) {
        info!(reason = reason.label(), "signed out, sign-in required");
    }
}

/// Clears the session and navigates to the signed-out entry point.
pub struct SessionTerminator {
    store: Arc<TokenStore>,
    navigator: Box<dyn Navigator>,
}

impl SessionTerminator {
    pub fn new(store: Arc<TokenStore>, navigator: impl Navigator + 'static) -> Self {
        Self::from_boxed(store, Box::new(navigator))
    }

    /// For navigators chosen at runtime.
    pub fn from_boxed(store: Arc<TokenStore>, navigator: Box<dyn Navigator>) -> Self {
        Self { store, navigator }
    }

    /// End the session. Idempotent: on an already signed-out store this only
    /// repeats the navigation.
    pub fn terminate(&self, reason: LogoutReason) {
        let had_session = self.store.is_authenticated();
        self.store.clear();
        crate::metrics::record_termination(reason);
        info!(reason = reason.label(), had_session, "session terminated");
        self.navigator.navigate_to_login(reason);
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }
}
