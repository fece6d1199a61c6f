//! Session coordination for the storefront API client
//!
//! Decides what a failed response means for the session and keeps the
//! request stream authenticated across token expiry:
//!
//! 1. `classify()` tags a failure as RateLimited, TokenExpired, ForcedLogout,
//!    GenericAuthError or Other
//! 2. `RefreshCoordinator` collapses overlapping TokenExpired failures into a
//!    single refresh call and hands the result to every caller that waited
//! 3. `SessionTerminator` clears the token and sends the user back to the
//!    sign-in entry point
//!
//! Refresh lifecycle:
//! 1. First expired caller moves the coordinator Idle → Refreshing and the
//!    refresh call starts on its own task
//! 2. Later expired callers queue behind it
//! 3. Refresh settles → token stored (or cleared), every queued caller is
//!    resolved in arrival order, coordinator back to Idle

pub mod classify;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod terminator;

pub use classify::{Classification, classify};
pub use coordinator::{
    DEFAULT_REFRESH_TIMEOUT, HttpRefresher, RefreshCoordinator, RefreshState, TokenRefresher,
};
pub use error::RefreshError;
pub use terminator::{LogoutReason, Navigator, SessionTerminator, TracingNavigator};
