//! Refresh failure type

use std::time::Duration;

/// Why a refresh attempt failed.
///
/// `Clone` because one failure is delivered to every caller queued behind
/// the refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh rejected ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        should_logout: bool,
    },

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh response carried no usable token: {0}")]
    MissingToken(String),

    #[error("refresh timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("refresh task ended before settling")]
    Aborted,
}

impl RefreshError {
    /// Whether the failure response told the client to end the session.
    pub fn demands_logout(&self) -> bool {
        matches!(
            self,
            RefreshError::Rejected {
                should_logout: true,
                ..
            }
        )
    }

    /// Short label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            RefreshError::Rejected { .. } => "rejected",
            RefreshError::Transport(_) => "transport",
            RefreshError::MissingToken(_) => "missing_token",
            RefreshError::Timeout(_) => "timeout",
            RefreshError::Aborted => "aborted",
        }
    }
}

impl From<session_auth::Error> for RefreshError {
    fn from(err: session_auth::Error) -> Self {
        match err {
            session_auth::Error::RefreshRejected {
                status,
                message,
                should_logout,
            } => RefreshError::Rejected {
                status,
                message,
                should_logout,
            },
            session_auth::Error::Http(msg) => RefreshError::Transport(msg),
            session_auth::Error::TokenParse(msg) => RefreshError::MissingToken(msg),
            other => RefreshError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rejection_with_flag_demands_logout() {
        let forced = RefreshError::Rejected {
            status: 401,
            message: "revoked".into(),
            should_logout: true,
        };
        let soft = RefreshError::Rejected {
            status: 401,
            message: "expired".into(),
            should_logout: false,
        };
        assert!(forced.demands_logout());
        assert!(!soft.demands_logout());
        assert!(!RefreshError::Timeout(Duration::from_secs(15)).demands_logout());
        assert!(!RefreshError::Aborted.demands_logout());
    }

    #[test]
    fn timeout_display_in_seconds() {
        assert_eq!(
            RefreshError::Timeout(Duration::from_secs(15)).to_string(),
            "refresh timed out after 15s"
        );
    }

    #[test]
    fn converts_auth_errors() {
        let rejected: RefreshError = session_auth::Error::RefreshRejected {
            status: 403,
            message: "nope".into(),
            should_logout: true,
        }
        .into();
        assert!(rejected.demands_logout());

        let transport: RefreshError = session_auth::Error::Http("connection refused".into()).into();
        assert_eq!(transport, RefreshError::Transport("connection refused".into()));

        let parse: RefreshError = session_auth::Error::TokenParse("no token".into()).into();
        assert_eq!(parse.label(), "missing_token");
    }
}
