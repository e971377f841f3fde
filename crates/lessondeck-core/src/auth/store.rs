//! Credential stores for the OAuth user token
//!
//! The provider never touches the token file directly; it goes through a
//! [`CredentialStore`] so tests and multi-tenant setups can swap the backend.

use super::credential::StoredToken;
use crate::error::{DeckError, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Load/save seam for the cached user token
pub trait CredentialStore: Send + Sync {
    /// Returns `Ok(None)` when nothing has been cached yet
    fn load(&self) -> Result<Option<StoredToken>>;

    fn save(&self, token: &StoredToken) -> Result<()>;
}

/// JSON file store (`token.json`)
///
/// Not safe for several processes sharing one file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<StoredToken>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No cached token at {}", self.path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(DeckError::FileRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        // A corrupt cache is treated as absent so the user can re-authorize
        match serde_json::from_str(&content) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable token cache {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DeckError::FileWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(token).map_err(|e| DeckError::FileWrite {
            path: self.path.clone(),
            source: std::io::Error::other(e),
        })?;

        std::fs::write(&self.path, content).map_err(|source| DeckError::FileWrite {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!("Saved token cache to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store, used by tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<StoredToken>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: StoredToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }

    pub fn current(&self) -> Option<StoredToken> {
        self.token.lock().clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<StoredToken>> {
        Ok(self.token.lock().clone())
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        *self.token.lock() = Some(token.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoredToken {
        StoredToken {
            access_token: "ya29.a0".to_string(),
            refresh_token: Some("1//0g".to_string()),
            expires_at: None,
            scopes: vec!["https://www.googleapis.com/auth/presentations".to_string()],
        }
    }

    #[test]
    fn test_file_store_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested/cache/token.json"));
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
    }

    #[test]
    fn test_file_store_corrupt_cache_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileCredentialStore::new(path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&sample()).unwrap();
        assert_eq!(store.current(), Some(sample()));
    }
}
