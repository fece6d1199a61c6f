//! Storefront API auth constants

/// Login endpoint (email + password → access token)
pub const LOGIN_PATH: &str = "/api/auth/login";

/// Registration endpoint (new account → access token)
pub const REGISTER_PATH: &str = "/api/auth/register";

/// Token refresh endpoint. The refresh credential travels in an HTTP-only
/// cookie set by login, never in a header.
pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// Logout endpoint (invalidates the refresh cookie server-side)
pub const LOGOUT_PATH: &str = "/api/auth/logout";

/// Path fragments identifying the auth endpoints. Matched as substrings so
/// both absolute URLs and bare paths are recognised.
pub const AUTH_ENDPOINT_PATTERNS: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/auth/refresh",
    "/auth/logout",
];

/// Key under which the access token is persisted in durable storage.
pub const TOKEN_STORAGE_KEY: &str = "token";

/// Error code the API uses for an expired access token.
pub const TOKEN_EXPIRED_CODE: &str = "TOKEN_EXPIRED";
