//! Session Storage - Persistence layer for the session token and user snapshot
//!
//! The two slots are always written together on login and cleared together
//! on logout.

use super::PersistedSession;
use authsync_core::{
    async_trait, storage_error, AuthSyncError, AuthSyncResult, ErrorContext, PersistenceConfig,
    SessionStore, User,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Volatile store, useful for tests and short-lived processes
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> AuthSyncResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AuthSyncResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> AuthSyncResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Store keeping one file per key under a directory
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    storage_dir: PathBuf,
}

impl FileSessionStore {
    /// Create a store rooted at `storage_dir`, creating it if needed
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> AuthSyncResult<Self> {
        let storage_dir = storage_dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&storage_dir).map_err(|e| {
            storage_error!(
                format!("Failed to create storage dir {}", storage_dir.display()),
                "file_session_store",
                e
            )
        })?;

        info!("Session storage initialized at: {}", storage_dir.display());

        Ok(Self { storage_dir })
    }

    /// Create a store under the configured directory or the platform data dir
    pub fn from_config(config: &PersistenceConfig) -> AuthSyncResult<Self> {
        match &config.storage_dir {
            Some(dir) => Self::new(dir),
            None => Self::new(Self::default_dir()?),
        }
    }

    fn default_dir() -> AuthSyncResult<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join("authsync"))
            .ok_or_else(|| AuthSyncError::Config {
                message: "Could not determine a data directory".to_string(),
                source: None,
                context: ErrorContext::new("file_session_store")
                    .with_suggestion("Set persistence.storage_dir explicitly"),
            })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn path_for(&self, key: &str) -> AuthSyncResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && key != "."
            && key != "..";
        if !valid {
            return Err(AuthSyncError::Validation {
                message: format!("Invalid storage key: {:?}", key),
                field: Some("key".to_string()),
                context: ErrorContext::new("file_session_store"),
            });
        }
        Ok(self.storage_dir.join(key))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> AuthSyncResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error!(
                format!("Failed to read {}", path.display()),
                "file_session_store",
                e
            )),
        }
    }

    async fn set(&self, key: &str, value: &str) -> AuthSyncResult<()> {
        let path = self.path_for(key)?;
        fs::write(&path, value).await.map_err(|e| {
            storage_error!(
                format!("Failed to write {}", path.display()),
                "file_session_store",
                e
            )
        })?;
        debug!("Stored key {} at {}", key, path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> AuthSyncResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error!(
                format!("Failed to remove {}", path.display()),
                "file_session_store",
                e
            )),
        }
    }
}

/// Writes and clears the token and user slots as a pair
#[derive(Clone)]
pub struct SessionPersistence {
    store: Arc<dyn SessionStore>,
    config: PersistenceConfig,
}

impl SessionPersistence {
    pub fn new(store: Arc<dyn SessionStore>, config: PersistenceConfig) -> Self {
        Self { store, config }
    }

    /// Write the session token and the serialized user
    pub async fn persist(&self, token: &str, user: &User) -> AuthSyncResult<()> {
        let user_json = serde_json::to_string(user)?;
        self.store.set(&self.config.token_key, token).await?;
        self.store.set(&self.config.user_key, &user_json).await?;
        Ok(())
    }

    /// Remove both slots. Both removals are attempted even if the first fails.
    pub async fn clear(&self) -> AuthSyncResult<()> {
        let token_result = self.store.remove(&self.config.token_key).await;
        let user_result = self.store.remove(&self.config.user_key).await;
        token_result.and(user_result)
    }

    /// Read back what was persisted. A corrupt user snapshot is dropped.
    pub async fn load(&self) -> AuthSyncResult<Option<PersistedSession>> {
        let Some(token) = self.store.get(&self.config.token_key).await? else {
            return Ok(None);
        };

        let user = match self.store.get(&self.config.user_key).await? {
            Some(raw) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable persisted user");
                    None
                }
            },
            None => None,
        };

        Ok(Some(PersistedSession { token, user }))
    }
}

impl std::fmt::Debug for SessionPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPersistence")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
