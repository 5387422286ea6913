// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Provides a simple, fast state store that doesn't persist across restarts.
// Useful for testing and for deployments that are happy to re-announce the
// whole feed after every restart.
//
// ## Crash Behavior
//
// - All state is lost on restart/crash
// - First cycle after a restart treats the whole feed as new

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::StateStoreConfig;
use crate::traits::state_store::{StateStore, StateStoreFactory, SyncState};

/// In-memory state store implementation
///
/// Clones share the same underlying record, so a test can keep a handle and
/// inspect what the engine saved.
///
/// # Example
///
/// ```rust
/// use vidsync_core::state::MemoryStateStore;
/// use vidsync_core::traits::{StateStore, SyncState};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///     assert_eq!(store.load().await?, SyncState::empty());
///
///     let mut state = SyncState::empty();
///     state.last_seen_id = Some("abc".to_string());
///     store.save(&state).await?;
///     assert_eq!(store.load().await?.last_seen_id.as_deref(), Some("abc"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<SyncState>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a state
    pub fn with_state(state: SyncState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Number of items currently held
    pub async fn len(&self) -> usize {
        self.inner.read().await.items.len()
    }

    /// Check if the store holds no items
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.items.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<SyncState, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, state: &SyncState) -> Result<(), Error> {
        *self.inner.write().await = state.clone();
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for creating memory state stores
pub struct MemoryStateStoreFactory;

impl StateStoreFactory for MemoryStateStoreFactory {
    fn create(&self, config: &StateStoreConfig) -> Result<Box<dyn StateStore>, Error> {
        match config {
            StateStoreConfig::Memory => Ok(Box::new(MemoryStateStore::new())),
            _ => Err(Error::config("Invalid config for memory state store")),
        }
    }
}
