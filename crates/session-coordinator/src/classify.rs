//! Failure classification for API responses
//!
//! Maps a non-2xx response to what it means for the session. Checks run in a
//! fixed priority order and the first match wins:
//!
//! 1. 429 → `RateLimited` (caller backs off, session untouched)
//! 2. 401 with `shouldLogout: true` → `ForcedLogout`. Checked before expiry:
//!    a server-mandated logout must never be mistaken for something a refresh
//!    can fix.
//! 3. 401 with an expiry signal on a request not yet retried → `TokenExpired`
//! 4. any other 401 → `GenericAuthError` (e.g. wrong password at login)
//! 5. everything else → `Other`

use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;
use session_auth::TOKEN_EXPIRED_CODE;

/// Phrases in `error`/`message` fields that mean the access token expired.
const EXPIRY_PATTERNS: &[&str] = &[
    "token expired",
    "token has expired",
    "jwt expired",
    "expired token",
    "access token expired",
];

/// Body fields inspected for an expiry signal.
const SIGNAL_FIELDS: &[&str] = &["error", "code", "message"];

/// What a failed response means for the caller and the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Back off for `retry_after_secs` before trying again.
    RateLimited { retry_after_secs: u64 },
    /// Access token expired; recoverable through a refresh.
    TokenExpired,
    /// Server instructed the client to drop the session.
    ForcedLogout,
    /// Authentication failed for this call only.
    GenericAuthError,
    /// Not an auth concern; surfaced unchanged.
    Other,
}

impl Classification {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::RateLimited { .. } => "rate_limited",
            Classification::TokenExpired => "token_expired",
            Classification::ForcedLogout => "forced_logout",
            Classification::GenericAuthError => "auth_error",
            Classification::Other => "other",
        }
    }
}

/// Classify a failed response.
///
/// `retried` is true when the request is already a replay after a refresh;
/// a second expiry on a replay is a `GenericAuthError`, which stops the
/// refresh/replay loop after one round.
pub fn classify(status: u16, headers: &HeaderMap, body: &str, retried: bool) -> Classification {
    let body: Option<Value> = serde_json::from_str(body).ok();

    match status {
        429 => Classification::RateLimited {
            retry_after_secs: retry_after_secs(headers, body.as_ref()),
        },
        401 => match body.as_ref() {
            Some(body) if signals_forced_logout(body) => Classification::ForcedLogout,
            Some(body) if !retried && signals_token_expiry(body) => Classification::TokenExpired,
            _ => Classification::GenericAuthError,
        },
        _ => Classification::Other,
    }
}

/// Seconds to wait before retrying a rate-limited call.
///
/// `Retry-After` header (integer seconds) first, then the body's
/// `retryAfter` (number or numeric string), else 0.
pub fn retry_after_secs(headers: &HeaderMap, body: Option<&Value>) -> u64 {
    let from_header = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    if let Some(secs) = from_header {
        return secs;
    }

    body.and_then(|b| b.get("retryAfter"))
        .and_then(seconds_from_value)
        .unwrap_or(0)
}

fn seconds_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.ceil() as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// `shouldLogout: true` at the top level of the body.
pub fn signals_forced_logout(body: &Value) -> bool {
    body.get("shouldLogout").and_then(Value::as_bool) == Some(true)
}

/// Whether the body says the access token expired.
///
/// Looks at `error`, `code` and `message`, both at the top level and inside
/// an `error` object. A field matches if it equals `TOKEN_EXPIRED` or
/// contains one of the expiry phrases (case-insensitive).
pub fn signals_token_expiry(body: &Value) -> bool {
    let nested = body.get("error").filter(|e| e.is_object());
    [Some(body), nested]
        .into_iter()
        .flatten()
        .flat_map(|scope| SIGNAL_FIELDS.iter().filter_map(move |f| scope.get(*f)))
        .filter_map(Value::as_str)
        .any(text_signals_expiry)
}

fn text_signals_expiry(text: &str) -> bool {
    if text.eq_ignore_ascii_case(TOKEN_EXPIRED_CODE) {
        return true;
    }
    let lower = text.to_lowercase();
    EXPIRY_PATTERNS.iter().any(|p| lower.contains(p))
}
