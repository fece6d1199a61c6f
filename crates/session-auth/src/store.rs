//! Access token store
//!
//! Owns the current access token. Two copies are kept:
//!
//! - the durable copy in a `TokenStorage` backend, so a restart resumes the
//!   session
//! - an in-memory mirror holding the token and its precomputed
//!   `Authorization` header, read by the dispatcher on every request
//!
//! Both are updated under one synchronous lock, so once `set_token` returns
//! there is no window in which a request could observe the new header while
//! storage still holds the old token (or the reverse).

use std::sync::{Mutex, MutexGuard, PoisonError};

use reqwest::header::HeaderValue;
use tracing::{debug, info, warn};

use crate::storage::{MemoryStorage, TokenStorage};
use crate::token::AccessToken;

#[derive(Default)]
struct Mirror {
    token: Option<AccessToken>,
    header: Option<HeaderValue>,
}

/// Current session credential, shared by the dispatcher, the refresh
/// coordinator and the session terminator.
pub struct TokenStore {
    storage: Box<dyn TokenStorage>,
    mirror: Mutex<Mirror>,
}

impl TokenStore {
    /// Open a store over `storage`, resuming any token it already holds.
    ///
    /// An unreadable backend is logged and treated as "no session": the user
    /// simply has to sign in again.
    pub fn open(storage: impl TokenStorage + 'static) -> Self {
        let stored = match storage.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "failed to load stored token, starting signed out");
                None
            }
        };

        let mirror = match stored.map(AccessToken::new) {
            Some(token) => match token.bearer_header() {
                Ok(header) => {
                    info!("resumed stored session");
                    Mirror {
                        token: Some(token),
                        header: Some(header),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "stored token is not a valid header value, ignoring");
                    Mirror::default()
                }
            },
            None => Mirror::default(),
        };

        Self {
            storage: Box::new(storage),
            mirror: Mutex::new(mirror),
        }
    }

    /// Store without durable persistence.
    pub fn in_memory() -> Self {
        Self::open(MemoryStorage::new())
    }

    /// Replace the current token, or clear it with `None`.
    ///
    /// Never fails. A token that cannot be encoded as a header value is
    /// treated as `None`, since a token that can never be sent is no session
    /// at all. Storage write failures are logged; the in-memory copy is still
    /// updated so the running process keeps working.
    pub fn set_token(&self, token: Option<AccessToken>) {
        let next = match token {
            Some(token) => match token.bearer_header() {
                Ok(header) => Some((token, header)),
                Err(e) => {
                    warn!(error = %e, "refusing token that is not a valid header value");
                    None
                }
            },
            None => None,
        };

        let mut mirror = self.lock();
        match next {
            Some((token, header)) => {
                if let Err(e) = self.storage.save(token.expose()) {
                    warn!(error = %e, "failed to persist access token");
                }
                mirror.token = Some(token);
                mirror.header = Some(header);
                debug!("access token updated");
            }
            None => {
                if let Err(e) = self.storage.remove() {
                    warn!(error = %e, "failed to remove persisted access token");
                }
                let had_token = mirror.token.take().is_some();
                mirror.header = None;
                if had_token {
                    debug!("access token cleared");
                }
            }
        }
    }

    /// The current token, if any.
    pub fn get_token(&self) -> Option<AccessToken> {
        self.lock().token.clone()
    }

    /// The `Authorization: Bearer ...` value for the current token.
    pub fn authorization(&self) -> Option<HeaderValue> {
        self.lock().header.clone()
    }

    /// Token and header read under one lock, so the header is guaranteed to
    /// belong to the returned token.
    pub fn current(&self) -> Option<(AccessToken, HeaderValue)> {
        let mirror = self.lock();
        mirror.token.clone().zip(mirror.header.clone())
    }

    /// Equivalent to `set_token(None)`.
    pub fn clear(&self) {
        self.set_token(None);
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().token.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Mirror> {
        self.mirror.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::storage::FileStorage;

    /// Backend whose writes always fail.
    struct BrokenStorage;

    impl TokenStorage for BrokenStorage {
        fn load(&self) -> Result<Option<String>> {
            Err(Error::Io("disk on fire".into()))
        }
        fn save(&self, _token: &str) -> Result<()> {
            Err(Error::Io("disk on fire".into()))
        }
        fn remove(&self) -> Result<()> {
            Err(Error::Io("disk on fire".into()))
        }
    }

    #[test]
    fn starts_empty() {
        let store = TokenStore::in_memory();
        assert!(store.get_token().is_none());
        assert!(store.authorization().is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn set_updates_both_copies() {
        let backend = MemoryStorage::new();
        let store = TokenStore::open(backend.clone());

        store.set_token(Some(AccessToken::new("T1")));

        assert_eq!(store.get_token().unwrap().expose(), "T1");
        assert_eq!(store.authorization().unwrap(), "Bearer T1");
        assert_eq!(backend.peek().as_deref(), Some("T1"));
    }

    #[test]
    fn set_none_removes_both_copies() {
        let backend = MemoryStorage::with_token("T1");
        let store = TokenStore::open(backend.clone());
        assert!(store.is_authenticated());

        store.set_token(None);

        assert!(store.get_token().is_none());
        assert!(store.authorization().is_none());
        assert_eq!(backend.peek(), None);
    }

    #[test]
    fn current_pairs_token_with_its_header() {
        let store = TokenStore::in_memory();
        assert!(store.current().is_none());

        store.set_token(Some(AccessToken::new("T7")));
        let (token, header) = store.current().unwrap();
        assert_eq!(token.expose(), "T7");
        assert_eq!(header, "Bearer T7");
    }

    #[test]
    fn overwrite_replaces_header() {
        let store = TokenStore::in_memory();
        store.set_token(Some(AccessToken::new("T1")));
        store.set_token(Some(AccessToken::new("T2")));
        assert_eq!(store.authorization().unwrap(), "Bearer T2");
    }

    #[test]
    fn clear_is_idempotent() {
        let store = TokenStore::in_memory();
        store.clear();
        store.clear();
        assert!(store.get_token().is_none());
    }

    #[test]
    fn token_survives_reopen_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = TokenStore::open(FileStorage::new(&path));
        store.set_token(Some(AccessToken::new("persisted")));
        drop(store);

        let reopened = TokenStore::open(FileStorage::new(&path));
        assert_eq!(reopened.get_token().unwrap().expose(), "persisted");
        assert_eq!(reopened.authorization().unwrap(), "Bearer persisted");
    }

    #[test]
    fn login_after_corrupt_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{{ not json").unwrap();

        let store = TokenStore::open(FileStorage::new(&path));
        assert!(store.get_token().is_none());
        store.set_token(Some(AccessToken::new("fresh-login")));
        drop(store);

        let reopened = TokenStore::open(FileStorage::new(&path));
        assert_eq!(reopened.get_token().unwrap().expose(), "fresh-login");
    }

    #[test]
    fn invalid_token_clears_session() {
        let backend = MemoryStorage::with_token("good");
        let store = TokenStore::open(backend.clone());

        store.set_token(Some(AccessToken::new("bad\r\nheader")));

        assert!(store.get_token().is_none());
        assert_eq!(backend.peek(), None);
    }

    #[test]
    fn storage_failures_do_not_break_in_memory_copy() {
        let store = TokenStore::open(BrokenStorage);
        assert!(store.get_token().is_none());

        store.set_token(Some(AccessToken::new("still-works")));
        assert_eq!(store.get_token().unwrap().expose(), "still-works");

        store.set_token(None);
        assert!(store.get_token().is_none());
    }

    #[test]
    fn debug_does_not_leak_token() {
        let store = TokenStore::in_memory();
        store.set_token(Some(AccessToken::new("leaky")));
        let debug = format!("{store:?}");
        assert!(!debug.contains("leaky"));
        assert!(debug.contains("authenticated: true"));
    }
}
