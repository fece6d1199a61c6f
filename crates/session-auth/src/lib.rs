//! Session credential primitives for the storefront API
//!
//! Holds everything about the access token that does not involve
//! coordinating concurrent requests:
//!
//! 1. `TokenStore` keeps the current token in memory and in durable storage,
//!    together with the precomputed `Authorization` header value
//! 2. `is_auth_endpoint()` decides which paths must never carry a bearer token
//! 3. `refresh_access_token()` performs the cookie-authenticated refresh call
//! 4. `extract_access_token()` reads a token out of login/register/refresh
//!    response bodies
//!
//! The single-flight refresh state machine lives in `session-coordinator`.

pub mod constants;
pub mod endpoint;
pub mod error;
pub mod storage;
pub mod store;
pub mod token;

pub use constants::*;
pub use endpoint::is_auth_endpoint;
pub use error::{Error, Result};
pub use storage::{FileStorage, MemoryStorage, TokenStorage};
pub use store::TokenStore;
pub use token::{AccessToken, TokenShape, extract_access_token, refresh_access_token};
