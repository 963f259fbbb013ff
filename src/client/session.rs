//! Admin session and durable token storage.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, warn};

/// The storage key the bearer token lives under.
pub const TOKEN_KEY: &str = "admin_token";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage format: {0}")]
    Format(#[from] serde_json::Error),
}

/// Durable key/value storage that survives restarts of the client.
pub trait TokenStorage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// A JSON object on disk. A missing file reads as empty.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        fs::write(&self.path, serde_json::to_vec_pretty(entries)?)?;
        Ok(())
    }
}

impl TokenStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.read()?;
        if entries.remove(key).is_some() {
            self.write(&entries)?;
        }
        Ok(())
    }
}

/// Process-local storage, for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// The admin's bearer token, mirrored to durable storage.
pub struct Session {
    storage: Box<dyn TokenStorage>,
    token: Option<String>,
}

impl Session {
    /// Starts a session, picking up a token saved by an earlier one.
    /// Unreadable storage starts logged out.
    pub fn restore(storage: impl TokenStorage + 'static) -> Self {
        let token = match storage.load(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "could not read stored token");
                None
            }
        };
        debug!(logged_in = token.is_some(), "session restored");
        Self { storage: Box::new(storage), token }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    /// Keeps `token` in memory and storage. The in-memory token is set even
    /// when saving fails, so the session still works until restart.
    pub fn set_token(&mut self, token: String) -> Result<(), StorageError> {
        let saved = self.storage.save(TOKEN_KEY, &token);
        self.token = Some(token);
        saved
    }

    /// Forgets the token in memory and storage.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.token = None;
        self.storage.remove(TOKEN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    /// Shares one [`MemoryStorage`] between sessions.
    struct Shared(Arc<MemoryStorage>);

    impl TokenStorage for Shared {
        fn load(&self, key: &str) -> Result<Option<String>, StorageError> { self.0.load(key) }
        fn save(&self, key: &str, value: &str) -> Result<(), StorageError> { self.0.save(key, value) }
        fn remove(&self, key: &str) -> Result<(), StorageError> { self.0.remove(key) }
    }

    #[test]
    fn token_survives_a_new_session() {
        let storage = Arc::new(MemoryStorage::default());

        let mut first = Session::restore(Shared(Arc::clone(&storage)));
        assert!(!first.is_logged_in());
        first.set_token("abc".into()).unwrap();

        let mut second = Session::restore(Shared(Arc::clone(&storage)));
        assert_eq!(second.token(), Some("abc"));

        second.clear().unwrap();
        assert!(!second.is_logged_in());
        assert_eq!(storage.load(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn file_storage_round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!("aspen-guide-session-{}.json", std::process::id()));
        let _ = fs::remove_file(&path);

        let storage = FileStorage::new(&path);
        assert_eq!(storage.load(TOKEN_KEY).unwrap(), None);

        storage.save(TOKEN_KEY, "abc").unwrap();
        assert_eq!(FileStorage::new(&path).load(TOKEN_KEY).unwrap().as_deref(), Some("abc"));

        storage.remove(TOKEN_KEY).unwrap();
        assert_eq!(storage.load(TOKEN_KEY).unwrap(), None);

        let _ = fs::remove_file(&path);
    }
}
