//! Storefront API client
//!
//! Typed access to the storefront API with a session that survives access
//! token expiry:
//!
//! - `StorefrontClient` owns the HTTP client (with cookie jar), the token
//!   store and the refresh coordinator
//! - `RequestDispatcher` is the single outbound path; it attaches the bearer
//!   token, classifies failures and replays a request once after a refresh
//! - `AuthApi` signs in, registers and signs out
//! - `ResourceApi` wraps the product/donation/testimonial/FAQ endpoints

pub mod auth;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod request;
pub mod resources;

pub use auth::AuthApi;
pub use client::{ClientBuilder, StorefrontClient};
pub use dispatcher::RequestDispatcher;
pub use error::{Error, Result};
pub use request::{ApiRequest, ApiResponse};
pub use resources::{Resource, ResourceApi};

pub use session_auth::{AccessToken, FileStorage, MemoryStorage, TokenStorage, TokenStore};
pub use session_coordinator::{LogoutReason, Navigator, RefreshError, RefreshState};
