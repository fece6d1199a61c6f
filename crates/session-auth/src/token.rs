//! Access tokens and the refresh call
//!
//! The API hands out access tokens from three endpoints (login, register,
//! refresh) and has historically used three response shapes for them:
//!
//! - `{"data": {"accessToken": "..."}}` (current)
//! - `{"data": {"token": "..."}}` (legacy)
//! - `{"token": "..."}` (legacy)
//!
//! `extract_access_token` accepts all three but reports which one matched so
//! the legacy shapes can be spotted in logs and eventually removed.

use std::fmt;

use common::Secret;
use reqwest::header::{HeaderValue, InvalidHeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Opaque bearer credential.
///
/// Redacted in Debug output; the raw value is only reachable via `expose()`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Secret<String>);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Secret::new(value.into()))
    }

    /// The raw token string.
    pub fn expose(&self) -> &str {
        self.0.expose()
    }

    /// Build the `Authorization: Bearer <token>` header value.
    ///
    /// The value is marked sensitive so HTTP-level debug output skips it.
    pub fn bearer_header(&self) -> std::result::Result<HeaderValue, InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.expose()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken({:?})", self.0)
    }
}

/// Which response layout a token was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenShape {
    /// `data.accessToken`
    Canonical,
    /// `data.token`
    LegacyDataToken,
    /// top-level `token`
    LegacyTopLevel,
}

/// Pull an access token out of an auth response body.
///
/// `data.accessToken` wins when several shapes are present. Empty strings
/// count as absent.
pub fn extract_access_token(body: &Value) -> Option<(AccessToken, TokenShape)> {
    let candidates = [
        (body.pointer("/data/accessToken"), TokenShape::Canonical),
        (body.pointer("/data/token"), TokenShape::LegacyDataToken),
        (body.get("token"), TokenShape::LegacyTopLevel),
    ];

    for (value, shape) in candidates {
        if let Some(token) = value.and_then(Value::as_str).filter(|t| !t.is_empty()) {
            if shape != TokenShape::Canonical {
                debug!(?shape, "access token found in legacy response shape");
            }
            return Some((AccessToken::new(token), shape));
        }
    }
    None
}

/// Exchange the refresh cookie for a new access token.
///
/// Sends `POST <url>` with an empty body. The refresh credential is whatever
/// cookie the client's jar holds for the API origin; no bearer token is sent.
///
/// A non-2xx answer becomes `Error::RefreshRejected`, carrying the body's
/// `shouldLogout` flag so the caller can decide whether to end the session
/// outright.
pub async fn refresh_access_token(client: &reqwest::Client, url: &str) -> Result<AccessToken> {
    let response = client
        .post(url)
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));

    if !status.is_success() {
        let parsed: Option<Value> = serde_json::from_str(&body).ok();
        let should_logout = parsed
            .as_ref()
            .and_then(|v| v.get("shouldLogout"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message").or_else(|| v.get("error")))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or(body);
        return Err(Error::RefreshRejected {
            status: status.as_u16(),
            message,
            should_logout,
        });
    }

    let value: Value = serde_json::from_str(&body)
        .map_err(|e| Error::TokenParse(format!("invalid refresh response: {e}")))?;
    extract_access_token(&value)
        .map(|(token, _)| token)
        .ok_or_else(|| Error::TokenParse("refresh response carried no access token".into()))
}
