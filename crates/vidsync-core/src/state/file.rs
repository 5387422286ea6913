// # File State Store
//
// File-based implementation of StateStore with crash recovery.
//
// ## Purpose
//
// Persists the sync record across daemon restarts and crashes. The record
// is small enough to be rewritten in full on every merge.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "posts": [
//     {
//       "id": "dQw4w9WgXcQ",
//       "title": "...",
//       "description": "...",
//       "publishedAt": "2025-01-09T12:00:00Z",
//       "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg",
//       "videoUrl": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
//     }
//   ],
//   "lastCheckedVideoId": "dQw4w9WgXcQ"
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::config::StateStoreConfig;
use crate::traits::state_store::{StateStore, StateStoreFactory, SyncState};

/// File-based state store with crash recovery
///
/// Every `load` reads the file from disk; nothing is cached between cycles.
///
/// # Crash Recovery
///
/// - **Atomic writes**: New state written to temporary file, fsynced, then renamed
/// - **Backup**: Previous record kept in a `.backup` file
/// - **Corruption detection**: JSON validation on load
/// - **Recovery**: Falls back to the backup if the main file is corrupted.
///   If the backup is unusable too, `load` fails instead of returning an empty
///   state, so a damaged record is never overwritten by a fresh one.
///
/// # Example
///
/// ```rust,no_run
/// use vidsync_core::state::FileStateStore;
/// use vidsync_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/vidsync/posts.json");
///
///     let mut state = store.load().await?;
///     state.last_seen_id = Some("dQw4w9WgXcQ".to_string());
///     store.save(&state).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a file state store
    ///
    /// No I/O happens until the first `load` or `save`. A missing file reads
    /// as an empty state; parent directories are created on first save.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state from file with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load main state file
    /// 2. If it is corrupted, try loading backup and restore it
    /// 3. If backup is missing or corrupted too, fail
    async fn load_with_recovery(&self) -> Result<SyncState, Error> {
        let state = match Self::read_state(&self.path).await {
            Ok(ReadOutcome::Loaded(state)) => state,
            Ok(ReadOutcome::Missing) => {
                tracing::debug!("State file does not exist: {}", self.path.display());
                return Ok(SyncState::empty());
            }
            Ok(ReadOutcome::Corrupted(reason)) => {
                tracing::warn!(
                    "State file {} appears corrupted: {}. Attempting recovery from backup.",
                    self.path.display(),
                    reason
                );
                self.recover_from_backup().await?
            }
            Err(e) => return Err(e),
        };

        tracing::debug!("Loaded state from file: {} items", state.items.len());
        Ok(state)
    }

    async fn recover_from_backup(&self) -> Result<SyncState, Error> {
        let backup_path = Self::backup_path(&self.path);

        match Self::read_state(&backup_path).await? {
            ReadOutcome::Loaded(state) => {
                tracing::info!("Recovered state from backup: {} items", state.items.len());

                if let Err(restore_err) = Self::restore_from_backup(&self.path, &backup_path).await
                {
                    tracing::error!(
                        "Failed to restore state file from backup: {}",
                        restore_err
                    );
                }

                Ok(state)
            }
            ReadOutcome::Missing => Err(Error::persistence(format!(
                "State file {} is corrupted and no backup exists",
                self.path.display()
            ))),
            ReadOutcome::Corrupted(reason) => Err(Error::persistence(format!(
                "State file {} and its backup are both corrupted: {}",
                self.path.display(),
                reason
            ))),
        }
    }

    /// Read and parse one state file
    async fn read_state(path: &Path) -> Result<ReadOutcome, Error> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ReadOutcome::Missing);
            }
            Err(e) => {
                return Err(Error::persistence(format!(
                    "Failed to read state file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        match serde_json::from_str::<SyncState>(&content) {
            Ok(state) => Ok(ReadOutcome::Loaded(state)),
            Err(e) => Ok(ReadOutcome::Corrupted(e.to_string())),
        }
    }

    /// Write state to file atomically
    async fn write_state(&self, state: &SyncState) -> Result<(), Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| Error::persistence(format!("Failed to serialize state: {}", e)))?;

        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Create backup of current file (if it exists)
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let backup_path = Self::backup_path(&self.path);
            let staging = Self::staging_path(&backup_path);
            if let Err(e) = Self::replace_with_copy(&self.path, &backup_path, &staging).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    /// Restore state file from backup
    async fn restore_from_backup(path: &Path, backup_path: &Path) -> Result<(), Error> {
        let staging = Self::staging_path(path);
        Self::replace_with_copy(backup_path, path, &staging)
            .await
            .map_err(|e| {
                Error::persistence(format!(
                    "Failed to restore from backup {} to {}: {}",
                    backup_path.display(),
                    path.display(),
                    e
                ))
            })?;

        tracing::info!("Restored state file from backup");
        Ok(())
    }

    /// Copy `from` over `to` through a staging file, so `to` is either the
    /// old file or a complete copy, never a partial one
    async fn replace_with_copy(from: &Path, to: &Path, staging: &Path) -> std::io::Result<()> {
        fs::copy(from, staging).await?;
        fs::File::open(staging).await?.sync_all().await?;
        fs::rename(staging, to).await
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    /// Get path to backup file
    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    /// Sibling path used while copying onto `path`
    fn staging_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".partial");
        path.with_file_name(name)
    }
}

enum ReadOutcome {
    Loaded(SyncState),
    Missing,
    Corrupted(String),
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<SyncState, Error> {
        self.load_with_recovery().await
    }

    async fn save(&self, state: &SyncState) -> Result<(), Error> {
        self.write_state(state).await
    }

    fn store_name(&self) -> &'static str {
        "file"
    }
}

/// Factory for creating file state stores
pub struct FileStateStoreFactory;

impl StateStoreFactory for FileStateStoreFactory {
    fn create(&self, config: &StateStoreConfig) -> Result<Box<dyn StateStore>, Error> {
        match config {
            StateStoreConfig::File { path } => {
                if path.is_empty() {
                    return Err(Error::config("State file path is required"));
                }
                Ok(Box::new(FileStateStore::new(path)))
            }
            _ => Err(Error::config("Invalid config for file state store")),
        }
    }
}
