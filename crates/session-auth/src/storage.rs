//! Durable token storage backends
//!
//! The access token is the only piece of client state that survives a
//! restart. It is kept in a small key-value JSON document so it behaves like
//! browser local storage: one well-known key (`token`), written on every
//! login/refresh and removed on logout.
//!
//! Storage calls are synchronous. `TokenStore::set_token` must leave the
//! durable copy and the in-memory header copy consistent before it returns,
//! and the document is a few dozen bytes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::constants::TOKEN_STORAGE_KEY;
use crate::error::{Error, Result};

/// Backend that persists the raw access token.
pub trait TokenStorage: Send + Sync {
    /// Read the stored token, `None` if nothing is stored.
    fn load(&self) -> Result<Option<String>>;

    /// Store `token`, replacing any previous value.
    fn save(&self, token: &str) -> Result<()>;

    /// Remove the stored token. Removing an absent token is not an error.
    fn remove(&self) -> Result<()>;
}

impl<T: TokenStorage + ?Sized> TokenStorage for Box<T> {
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }

    fn save(&self, token: &str) -> Result<()> {
        (**self).save(token)
    }

    fn remove(&self) -> Result<()> {
        (**self).remove()
    }
}

/// JSON file backend.
///
/// The file holds a JSON object; only the `token` key is owned by this
/// backend, any other keys are preserved. A missing file means no token.
/// Writes go through temp-file + rename and the file is `0600` on unix since
/// it holds a live bearer credential.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::Io(format!("reading token file: {e}")))?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(Error::Storage(format!(
                "token file {} is not a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(Error::Storage(format!("parsing token file: {e}"))),
        }
    }

    /// Document to update on save/remove. An unreadable document is replaced
    /// rather than blocking every later write; the flag says it was reset.
    fn writable_document(&self) -> Result<(Map<String, Value>, bool)> {
        match self.read_document() {
            Ok(document) => Ok((document, false)),
            Err(Error::Storage(reason)) => {
                warn!(path = %self.path.display(), %reason, "replacing unreadable token file");
                Ok((Map::new(), true))
            }
            Err(e) => Err(e),
        }
    }
}

impl TokenStorage for FileStorage {
    fn load(&self) -> Result<Option<String>> {
        let document = self.read_document()?;
        Ok(document
            .get(TOKEN_STORAGE_KEY)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_owned))
    }

    fn save(&self, token: &str) -> Result<()> {
        let (mut document, _) = self.writable_document()?;
        document.insert(TOKEN_STORAGE_KEY.into(), Value::String(token.to_owned()));
        write_atomic(&self.path, &document)
    }

    fn remove(&self) -> Result<()> {
        let (mut document, reset) = self.writable_document()?;
        if document.remove(TOKEN_STORAGE_KEY).is_none() && !reset {
            return Ok(());
        }
        write_atomic(&self.path, &document)
    }
}

/// In-process backend for tests and ephemeral sessions.
///
/// Clones share the same slot, so a test can keep a handle and inspect what
/// the store persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backend with a token, as if a previous session had saved it.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(token.into()))),
        }
    }

    /// Current raw value in the slot.
    pub fn peek(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.peek())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Write the document atomically: temp file in the same directory, then
/// rename over the target.
fn write_atomic(path: &Path, document: &Map<String, Value>) -> Result<()> {
    let json = serde_json::to_string_pretty(document)
        .map_err(|e| Error::Storage(format!("serializing token file: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Io(format!("creating token directory: {e}")))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("session.json");
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    std::fs::write(&tmp_path, json.as_bytes())
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted token file");
    Ok(())
}
