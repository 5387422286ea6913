// # State Store Trait
//
// Defines the interface for the durable record of synced items.
//
// ## Purpose
//
// The state store owns the single persisted `SyncState`: every known item,
// newest-first, plus the id of the newest item seen at the last successful
// poll. The engine always reads the whole record and writes the whole
// record back; there are no partial-field updates.
//
// ## Implementations
//
// - File-based: JSON file replaced via write-then-rename
// - Memory: for tests and ephemeral deployments
//
// ## Usage
//
// ```rust,ignore
// use vidsync_core::StateStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* StateStore implementation */;
//
//     let mut state = store.load().await?;
//     state.last_seen_id = Some("abc123".to_string());
//     store.save(&state).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A synced feed entry
///
/// Field names on the wire match the persisted layout used by earlier
/// deployments (`publishedAt`, `thumbnail`, `videoUrl`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Identity key, stable across polls
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Publication time, display only
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default, rename = "thumbnail")]
    pub thumbnail_url: Option<String>,

    /// Public URL of the item, derived from `id` by the feed client
    #[serde(rename = "videoUrl")]
    pub source_url: String,
}

/// The persisted sync record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Known items, newest-first, unique by id
    #[serde(default, rename = "posts")]
    pub items: Vec<Item>,

    /// Id of the feed's newest item at the last successful poll
    #[serde(default, rename = "lastCheckedVideoId")]
    pub last_seen_id: Option<String>,
}

impl SyncState {
    /// Create an empty state (no items, no cursor)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set of every known item id
    pub fn known_ids(&self) -> HashSet<&str> {
        self.items.iter().map(|item| item.id.as_str()).collect()
    }

    /// Whether a poll has ever completed successfully against this state
    pub fn is_seeded(&self) -> bool {
        self.last_seen_id.is_some()
    }
}

/// Trait for state store implementations
///
/// # Atomicity
///
/// `save` replaces the whole record. A reader (including a process started
/// after a crash) must observe either the previous record or the new one,
/// never a mix.
///
/// # Ownership
///
/// The store is written by a single sync task. Cross-process locking is out of
/// scope: deployments run one writer per record.
///
/// ## Forbidden Capabilities
/// - ❌ Merge or deduplicate items (owned by `SyncEngine`)
/// - ❌ Talk to the feed API (owned by `FeedClient`)
/// - ❌ Spawn background tasks or cache writes for later flushing
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the last persisted state
    ///
    /// # Returns
    ///
    /// - `Ok(SyncState)`: The persisted state, or an empty state if nothing was
    ///   ever saved
    /// - `Err(Error)`: The record exists but cannot be read
    async fn load(&self) -> Result<SyncState, crate::Error>;

    /// Durably replace the persisted state
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The new record is durable
    /// - `Err(Error)`: Nothing was replaced; the previous record is intact
    async fn save(&self, state: &SyncState) -> Result<(), crate::Error>;

    /// Short name for logging
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing state stores from configuration
pub trait StateStoreFactory: Send + Sync {
    /// Create a StateStore instance from configuration
    fn create(
        &self,
        config: &crate::config::StateStoreConfig,
    ) -> Result<Box<dyn StateStore>, crate::Error>;
}
