//! Error types for session credential operations

/// Errors from token storage and the refresh call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("refresh rejected ({status}): {message}")]
    RefreshRejected {
        status: u16,
        message: String,
        /// The API demanded that the client drop its session.
        should_logout: bool,
    },

    #[error("token parse error: {0}")]
    TokenParse(String),

    #[error("token storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for session credential operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_rejected_display_includes_status() {
        let err = Error::RefreshRejected {
            status: 401,
            message: "refresh cookie missing".into(),
            should_logout: true,
        };
        assert_eq!(
            err.to_string(),
            "refresh rejected (401): refresh cookie missing"
        );
    }
}
