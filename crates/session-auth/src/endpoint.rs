//! Auth endpoint detection
//!
//! Requests that establish or destroy the session (login, register, refresh,
//! logout) must go out without a bearer token: a stale token on a login
//! request can make the API answer with an expiry error instead of checking
//! the submitted credentials.

use crate::constants::AUTH_ENDPOINT_PATTERNS;

/// Whether `path` (a bare path or a full URL) targets an auth endpoint.
pub fn is_auth_endpoint(path: &str) -> bool {
    AUTH_ENDPOINT_PATTERNS
        .iter()
        .any(|pattern| path.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_paths_are_detected() {
        assert!(is_auth_endpoint("/api/auth/login"));
        assert!(is_auth_endpoint("/api/auth/register"));
        assert!(is_auth_endpoint("/api/auth/refresh"));
        assert!(is_auth_endpoint("/api/auth/logout"));
    }

    #[test]
    fn full_urls_are_detected() {
        assert!(is_auth_endpoint("https://shop.example.org/api/auth/refresh"));
        assert!(is_auth_endpoint("http://127.0.0.1:3000/api/auth/login?next=/admin"));
    }

    #[test]
    fn resource_paths_are_not_auth_endpoints() {
        assert!(!is_auth_endpoint("/api/products"));
        assert!(!is_auth_endpoint("/api/products/42"));
        assert!(!is_auth_endpoint("/api/faqs"));
        assert!(!is_auth_endpoint("/api/auth/me"));
    }

    #[test]
    fn match_is_case_sensitive() {
        assert!(!is_auth_endpoint("/api/AUTH/LOGIN"));
    }
}
