//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use session_auth::{MemoryStorage, TokenStorage, TokenStore};
use session_coordinator::{
    DEFAULT_REFRESH_TIMEOUT, HttpRefresher, Navigator, RefreshCoordinator, SessionTerminator,
    TracingNavigator,
};

use crate::auth::AuthApi;
use crate::dispatcher::RequestDispatcher;
use crate::error::{Error, Result};
use crate::request::{ApiRequest, ApiResponse};
use crate::resources::{Resource, ResourceApi};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Storefront API client.
///
/// Cheap to clone; clones share the session, the cookie jar and the refresh
/// coordinator.
///
/// # Example
///
/// ```no_run
/// use api_client::StorefrontClient;
///
/// # async fn example() -> api_client::Result<()> {
/// let client = StorefrontClient::builder()
///     .base_url("https://shop.example.org")
///     .build()?;
///
/// client.auth().login("jo@example.org", "hunter2").await?;
/// let products = client.products().list().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StorefrontClient {
    dispatcher: RequestDispatcher,
}

impl StorefrontClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Send an arbitrary request through the authenticated path.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.dispatcher.dispatch(request).await
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        self.dispatcher.store()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store().is_authenticated()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Login, registration and logout.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    pub fn resource(&self, resource: Resource) -> ResourceApi {
        ResourceApi::new(self.clone(), resource)
    }

    pub fn products(&self) -> ResourceApi {
        self.resource(Resource::Products)
    }

    pub fn donations(&self) -> ResourceApi {
        self.resource(Resource::Donations)
    }

    pub fn testimonials(&self) -> ResourceApi {
        self.resource(Resource::Testimonials)
    }

    pub fn faqs(&self) -> ResourceApi {
        self.resource(Resource::Faqs)
    }
}

impl std::fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("store", self.store())
            .field("refresh_state", &self.dispatcher.coordinator().state())
            .finish()
    }
}

/// Builder for `StorefrontClient`.
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    refresh_timeout: Duration,
    user_agent: Option<String>,
    storage: Option<Box<dyn TokenStorage>>,
    navigator: Option<Box<dyn Navigator>>,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            user_agent: None,
            storage: None,
            navigator: None,
        }
    }

    /// API origin, e.g. `https://shop.example.org`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Upper bound on one token refresh call.
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Where the access token is persisted. Defaults to memory only.
    pub fn storage(mut self, storage: impl TokenStorage + 'static) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    /// What happens when the session ends. Defaults to a log line.
    pub fn navigator(mut self, navigator: impl Navigator + 'static) -> Self {
        self.navigator = Some(Box::new(navigator));
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<StorefrontClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".into()))?;
        let parsed = reqwest::Url::parse(&base_url)
            .map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("storefront-client/{}", env!("CARGO_PKG_VERSION")));

        // The cookie jar carries the refresh credential from login to refresh.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .build()?;

        let storage = self
            .storage
            .unwrap_or_else(|| Box::new(MemoryStorage::new()));
        let store = Arc::new(TokenStore::open(storage));

        let navigator = self
            .navigator
            .unwrap_or_else(|| Box::new(TracingNavigator));
        let terminator = Arc::new(SessionTerminator::from_boxed(Arc::clone(&store), navigator));

        let refresher = Arc::new(HttpRefresher::new(http.clone(), &base_url));
        let coordinator = RefreshCoordinator::new(store, refresher, terminator)
            .with_timeout(self.refresh_timeout);

        Ok(StorefrontClient {
            dispatcher: RequestDispatcher::new(http, base_url, self.timeout, coordinator),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_base_url() {
        let result = StorefrontClient::builder().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn builder_rejects_non_http_scheme() {
        let result = StorefrontClient::builder()
            .base_url("ftp://shop.example.org")
            .build();
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn builder_resumes_stored_session() {
        let client = StorefrontClient::builder()
            .base_url("http://127.0.0.1:9")
            .storage(MemoryStorage::with_token("resumed"))
            .build()
            .unwrap();
        assert!(client.is_authenticated());
        assert_eq!(client.store().get_token().unwrap().expose(), "resumed");
    }

    #[test]
    fn debug_does_not_leak_token() {
        let client = StorefrontClient::builder()
            .base_url("http://127.0.0.1:9")
            .storage(MemoryStorage::with_token("leaky"))
            .build()
            .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("leaky"));
        assert!(debug.contains("Idle"));
    }
}
