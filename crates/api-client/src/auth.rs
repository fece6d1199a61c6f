//! Auth API.
//!
//! Login and registration store the returned access token; the refresh
//! cookie they set lands in the client's cookie jar. These calls go to auth
//! endpoints, so the dispatcher never attaches a bearer token to them and
//! never routes their failures into a refresh.

use serde::Serialize;
use serde_json::Value;
use session_auth::{LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH, extract_access_token};
use session_coordinator::LogoutReason;
use tracing::{info, warn};

use crate::client::StorefrontClient;
use crate::error::{Error, Result};
use crate::request::ApiRequest;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

/// Auth API client.
pub struct AuthApi {
    client: StorefrontClient,
}

impl AuthApi {
    pub(crate) fn new(client: StorefrontClient) -> Self {
        Self { client }
    }

    /// Sign in. Returns the response body (it usually carries the user
    /// profile under `data`).
    pub async fn login(&self, email: &str, password: &str) -> Result<Value> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest { email, password })?;
        let body = self.authenticate(request).await?;
        info!("signed in");
        Ok(body)
    }

    /// Create an account and sign in with it.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Value> {
        let request = ApiRequest::post(REGISTER_PATH).json(&RegisterRequest {
            name,
            email,
            password,
        })?;
        let body = self.authenticate(request).await?;
        info!("registered and signed in");
        Ok(body)
    }

    /// Sign out.
    ///
    /// The server call is best effort: the local session ends even if the
    /// server is unreachable or rejects the call. The navigator runs once.
    pub async fn logout(&self) -> Result<()> {
        match self.client.send(ApiRequest::post(LOGOUT_PATH)).await {
            // The dispatcher already terminated the session.
            Err(Error::ForcedLogout { .. }) => return Ok(()),
            Err(e) => warn!(error = %e, "logout call failed, ending local session anyway"),
            Ok(_) => {}
        }
        self.client
            .dispatcher()
            .terminator()
            .terminate(LogoutReason::UserRequested);
        Ok(())
    }

    async fn authenticate(&self, request: ApiRequest) -> Result<Value> {
        let response = self.client.send(request).await?;
        let body: Value = response.json()?;
        let (token, _shape) = extract_access_token(&body).ok_or(Error::MissingToken)?;
        self.client.store().set_token(Some(token));
        Ok(body)
    }
}
