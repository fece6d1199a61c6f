//! Outbound request path
//!
//! Every API call goes through `RequestDispatcher::dispatch`:
//!
//! 1. Attach `Authorization: Bearer <token>` from the token store, unless the
//!    path is an auth endpoint (those never carry the bearer header)
//! 2. Send; 2xx responses are returned as-is
//! 3. Classify the failure:
//!    - RateLimited → `Error::RateLimited`, session untouched
//!    - ForcedLogout → terminate the session, `Error::ForcedLogout`
//!    - TokenExpired → wait for the shared refresh, replay once with the new
//!      token
//!    - GenericAuthError → `Error::Unauthorized`
//!    - Other → `Error::Api`

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, HeaderValue};
use session_auth::{AccessToken, TokenStore, is_auth_endpoint};
use session_coordinator::{
    Classification, LogoutReason, RefreshCoordinator, SessionTerminator, classify,
};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{Error, Result};
use crate::request::{ApiRequest, ApiResponse};

/// Sends API requests and keeps them authenticated across token expiry.
#[derive(Clone)]
pub struct RequestDispatcher {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    store: Arc<TokenStore>,
    coordinator: RefreshCoordinator,
    terminator: Arc<SessionTerminator>,
}

impl RequestDispatcher {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        timeout: Duration,
        coordinator: RefreshCoordinator,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let store = Arc::clone(coordinator.store());
        let terminator = Arc::clone(coordinator.terminator());
        Self {
            http,
            base_url,
            timeout,
            store,
            coordinator,
            terminator,
        }
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn terminator(&self) -> &Arc<SessionTerminator> {
        &self.terminator
    }

    /// Send `request`, refreshing and replaying once if the token expired.
    pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        let span = info_span!(
            "dispatch",
            request_id = %request_id,
            method = %request.method(),
            path = %request.path(),
        );
        self.dispatch_inner(request).instrument(span).await
    }

    async fn dispatch_inner(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        let auth_endpoint = is_auth_endpoint(request.path());

        // Token the request goes out with. Kept alongside the header so a
        // failure can tell the coordinator which token it saw expire.
        let mut credential = if auth_endpoint {
            None
        } else {
            self.store.current()
        };

        loop {
            let header = credential.as_ref().map(|(_, header)| header.clone());
            let failure = match self.send_once(&request, auth_endpoint, header).await? {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            let classification = classify(
                failure.status,
                &failure.headers,
                &failure.body,
                request.retried(),
            );
            debug!(
                status = failure.status,
                classification = classification.label(),
                "request failed"
            );

            match classification {
                Classification::RateLimited { retry_after_secs } => {
                    warn!(retry_after_secs, "rate limited");
                    return Err(Error::RateLimited {
                        retry_after_secs,
                        body: failure.body,
                    });
                }
                Classification::ForcedLogout => {
                    warn!("server ended the session");
                    self.terminator.terminate(LogoutReason::ForcedByServer);
                    return Err(Error::ForcedLogout { body: failure.body });
                }
                Classification::TokenExpired if !auth_endpoint => {
                    let stale = credential.as_ref().map(|(token, _)| token);
                    let token = self.coordinator.handle_expired_token(stale).await?;
                    credential = Some(bearer(token)?);
                    request.mark_retried();
                    crate::metrics::record_replay();
                    info!("replaying request with refreshed token");
                }
                Classification::TokenExpired | Classification::GenericAuthError => {
                    return Err(Error::Unauthorized {
                        status: failure.status,
                        body: failure.body,
                    });
                }
                Classification::Other => {
                    return Err(Error::Api {
                        status: failure.status,
                        body: failure.body,
                    });
                }
            }
        }
    }

    /// One HTTP exchange. The outer `Result` is transport-level; the inner
    /// one separates 2xx responses from failures that need classifying.
    async fn send_once(
        &self,
        request: &ApiRequest,
        auth_endpoint: bool,
        authorization: Option<HeaderValue>,
    ) -> Result<std::result::Result<ApiResponse, Failure>> {
        let mut url = self.url(request.path())?;
        if !request.query_pairs().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query_pairs());
        }

        let mut headers = request.headers().clone();
        if auth_endpoint {
            headers.remove(AUTHORIZATION);
        } else if let Some(value) = authorization {
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = self
            .http
            .request(request.method().clone(), url)
            .headers(headers)
            .timeout(self.timeout);
        if let Some(body) = request.body_bytes() {
            builder = builder.body(body.clone());
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "request failed to send");
            Error::Http(e)
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        crate::metrics::record_request(
            status.as_u16(),
            request.method().as_str(),
            started.elapsed().as_secs_f64(),
        );

        if status.is_success() {
            return Ok(Ok(ApiResponse::new(status, headers, body)));
        }
        Ok(Err(Failure {
            status: status.as_u16(),
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        }))
    }

    fn url(&self, path: &str) -> Result<reqwest::Url> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        reqwest::Url::parse(&joined).map_err(|e| Error::InvalidUrl(format!("{joined}: {e}")))
    }
}

/// Non-2xx response, buffered for classification.
struct Failure {
    status: u16,
    headers: reqwest::header::HeaderMap,
    body: String,
}

fn bearer(token: AccessToken) -> Result<(AccessToken, HeaderValue)> {
    let header = token
        .bearer_header()
        .map_err(|e| Error::InvalidHeader(format!("authorization: {e}")))?;
    Ok((token, header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_auth::MemoryStorage;
    use session_coordinator::{HttpRefresher, TracingNavigator};

    fn dispatcher(base_url: &str) -> RequestDispatcher {
        let http = reqwest::Client::new();
        let store = Arc::new(TokenStore::open(MemoryStorage::new()));
        let terminator = Arc::new(SessionTerminator::new(Arc::clone(&store), TracingNavigator));
        let refresher = Arc::new(HttpRefresher::new(http.clone(), base_url));
        let coordinator = RefreshCoordinator::new(store, refresher, terminator);
        RequestDispatcher::new(http, base_url, Duration::from_secs(5), coordinator)
    }

    #[test]
    fn url_joins_with_single_slash() {
        let d = dispatcher("https://shop.example.org/");
        assert_eq!(
            d.url("/api/products").unwrap().as_str(),
            "https://shop.example.org/api/products"
        );
        assert_eq!(
            d.url("api/faqs").unwrap().as_str(),
            "https://shop.example.org/api/faqs"
        );
    }

    #[test]
    fn query_pairs_are_encoded() {
        let d = dispatcher("https://shop.example.org");
        let mut url = d.url("/api/products").unwrap();
        url.query_pairs_mut()
            .extend_pairs([("category", "shoes & bags"), ("page", "2")]);
        assert_eq!(url.query(), Some("category=shoes+%26+bags&page=2"));
    }

    #[test]
    fn bad_base_url_is_invalid_url() {
        let d = dispatcher("not a url");
        assert!(matches!(d.url("/api/products"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn bearer_rejects_unencodable_token() {
        assert!(bearer(AccessToken::new("ok")).is_ok());
        assert!(matches!(
            bearer(AccessToken::new("no\nway")),
            Err(Error::InvalidHeader(_))
        ));
    }
}
