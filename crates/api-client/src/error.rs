//! Client error types.

use std::time::Duration;

use session_coordinator::RefreshError;
use thiserror::Error;

/// Client error type.
///
/// Failed API responses carry the status and raw body so callers can show
/// the server's own message.
#[derive(Debug, Error)]
pub enum Error {
    /// Server asked the client to back off. The session is untouched.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64, body: String },

    /// Server ended the session; the token has already been cleared.
    #[error("session ended by server")]
    ForcedLogout { body: String },

    /// Authentication failed for this call (bad credentials, or a replayed
    /// request that still was not accepted).
    #[error("authentication failed ({status}): {body}")]
    Unauthorized { status: u16, body: String },

    /// Any other non-2xx response.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Token expired and the refresh could not replace it. The token has
    /// already been cleared.
    #[error("session refresh failed: {0}")]
    RefreshFailed(#[from] RefreshError),

    /// Auth response was 2xx but carried no access token.
    #[error("response carried no access token")]
    MissingToken,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown resource '{0}'")]
    UnknownResource(String),
}

impl Error {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    /// How long to wait before retrying, for rate-limited calls.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited {
                retry_after_secs, ..
            } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }

    /// Whether the session is gone and the user has to sign in again.
    pub fn ends_session(&self) -> bool {
        matches!(self, Error::ForcedLogout { .. } | Error::RefreshFailed(_))
    }

    /// HTTP status of the failed response, if the error came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RateLimited { .. } => Some(429),
            Error::ForcedLogout { .. } => Some(401),
            Error::Unauthorized { status, .. } | Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
