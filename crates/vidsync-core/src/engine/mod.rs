//! Core sync engine
//!
//! The SyncEngine is responsible for:
//! - Loading the persisted state
//! - Fetching the full feed snapshot via FeedClient
//! - Computing the new-item delta against every known id
//! - Persisting the merged state
//! - Announcing the delta through the NotificationSink
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Scheduler  │─── run_once(feed_id) ───┐
//! └─────────────┘                         │
//!                                         ▼
//!                                ┌──────────────┐
//!                                │  SyncEngine  │
//!                                └──────────────┘
//!                                         │
//!         ┌───────────────┬───────────────┼───────────────┬───────────────┐
//!         ▼               ▼               ▼               ▼               ▼
//! ┌─────────────┐ ┌─────────────┐ ┌─────────────┐ ┌──────────────┐ ┌──────────┐
//! │ StateStore  │ │ FeedClient  │ │ StateStore  │ │ Notification │ │  Reader  │
//! │ (load)      │ │ (fetch all) │ │ (save)      │ │ Sink         │ │ (publish)│
//! └─────────────┘ └─────────────┘ └─────────────┘ └──────────────┘ └──────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Load state
//! 2. Fetch every page; on failure stop, nothing is written
//! 3. Empty snapshot: stop, nothing is written
//! 4. Delta = entries whose id is not yet known
//! 5. Non-empty delta: prepend, move cursor, save, publish, notify once
//! 6. Empty delta on an unseeded state: seed the cursor silently

pub mod delta;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::notify::compose_batch;
use crate::reader::{ItemsPublisher, ItemsReader};
use crate::traits::{FeedClient, FeedId, Item, NotificationSink, StateStore, SyncState};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A cycle began
    CycleStarted,

    /// The state record could not be loaded
    LoadFailed { error: String },

    /// The feed could not be fetched
    FetchFailed { error: String },

    /// The feed returned no entries
    FeedEmpty,

    /// Every fetched entry is already known
    Unchanged { known_items: usize },

    /// New items were merged and persisted
    Merged {
        new_items: usize,
        total_items: usize,
        notified: bool,
    },

    /// The cursor was set on an unseeded state without any new items
    CursorSeeded { newest_id: String },

    /// The merged state could not be saved; the delta was discarded
    PersistFailed { error: String },

    /// The notification sink failed; the merge stands
    NotifyFailed { error: String },

    /// Feed resolution failed; no cycles will run
    Disabled { reason: String },

    /// Scheduler stopped
    Stopped { reason: String },
}

/// Result of a completed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The feed had no entries; state untouched
    FeedEmpty,

    /// No new items; state untouched
    Unchanged,

    /// No new items, but the cursor was seeded and persisted
    CursorSeeded { newest_id: String },

    /// New items (newest first) were persisted
    Merged { items: Vec<Item>, notified: bool },
}

/// Core sync engine
///
/// One engine owns one state record. Invocations of [`SyncEngine::run_once`]
/// must not overlap; the [`Scheduler`](crate::scheduler::Scheduler) guarantees
/// this by awaiting each cycle before arming the next tick.
pub struct SyncEngine {
    /// Feed client for the external API
    feed_client: Box<dyn FeedClient>,

    /// Durable state
    state_store: Box<dyn StateStore>,

    /// Batch announcements
    notifier: Box<dyn NotificationSink>,

    /// Whether the first merge into an unseeded state is announced
    notify_on_first_run: bool,

    /// Snapshot publisher for read-only consumers
    publisher: ItemsPublisher,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, items_reader, event_receiver). The reader starts
    /// empty; call [`SyncEngine::prime`] to publish the persisted items before
    /// the first cycle.
    pub fn new(
        feed_client: Box<dyn FeedClient>,
        state_store: Box<dyn StateStore>,
        notifier: Box<dyn NotificationSink>,
        config: &EngineConfig,
    ) -> Result<(Self, ItemsReader, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);
        let (publisher, reader) = ItemsPublisher::new();

        let engine = Self {
            feed_client,
            state_store,
            notifier,
            notify_on_first_run: config.notify_on_first_run,
            publisher,
            event_tx: tx,
        };

        Ok((engine, reader, rx))
    }

    /// Publish the persisted items to readers without contacting the feed
    pub async fn prime(&self) -> Result<()> {
        let state = self.state_store.load().await?;
        debug!(
            "Primed reader with {} persisted items from {} store",
            state.items.len(),
            self.state_store.store_name()
        );
        self.publisher.publish(state.items);
        Ok(())
    }

    /// Resolve the feed to poll for a channel
    pub async fn resolve_feed(&self, channel_id: &str) -> Result<FeedId> {
        let feed_id = self.feed_client.resolve_feed_id(channel_id).await?;
        info!(
            "Resolved channel {} to feed {} via {}",
            channel_id,
            feed_id,
            self.feed_client.client_name()
        );
        Ok(feed_id)
    }

    /// Run one sync cycle
    ///
    /// # Returns
    ///
    /// - `Ok(CycleOutcome)`: The cycle completed; see the variant for what changed
    /// - `Err(Error::Persistence)`: Load or save failed; nothing was announced
    /// - `Err(Error)`: The fetch failed; nothing was written
    pub async fn run_once(&self, feed_id: &FeedId) -> Result<CycleOutcome> {
        self.emit_event(SyncEvent::CycleStarted);

        let state = match self.state_store.load().await {
            Ok(state) => state,
            Err(e) => {
                self.emit_event(SyncEvent::LoadFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let raw = match self.feed_client.fetch_all_items(feed_id).await {
            Ok(raw) => raw,
            Err(e) => {
                self.emit_event(SyncEvent::FetchFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let Some(newest) = raw.first() else {
            debug!("Feed {} returned no entries", feed_id);
            self.emit_event(SyncEvent::FeedEmpty);
            return Ok(CycleOutcome::FeedEmpty);
        };
        let newest_id = newest.id.clone();

        let delta = delta::compute_delta(&state, &raw, |id| self.feed_client.source_url(id));

        if !delta.is_empty() {
            return self.apply_delta(&state, delta, &newest_id).await;
        }

        if !state.is_seeded() {
            let seeded = SyncState {
                items: state.items,
                last_seen_id: Some(newest_id.clone()),
            };
            self.persist(&seeded).await?;
            info!("Seeded sync cursor at {}", newest_id);
            self.emit_event(SyncEvent::CursorSeeded {
                newest_id: newest_id.clone(),
            });
            return Ok(CycleOutcome::CursorSeeded { newest_id });
        }

        debug!("No new items among {} fetched entries", raw.len());
        self.emit_event(SyncEvent::Unchanged {
            known_items: state.items.len(),
        });
        Ok(CycleOutcome::Unchanged)
    }

    /// Persist, publish and announce a non-empty delta
    async fn apply_delta(
        &self,
        state: &SyncState,
        delta: Vec<Item>,
        newest_id: &str,
    ) -> Result<CycleOutcome> {
        let merged = delta::merge(state, &delta, newest_id);
        self.persist(&merged).await?;

        let total_items = merged.items.len();
        self.publisher.publish(merged.items);

        let first_run = !state.is_seeded();
        let notified = if first_run && !self.notify_on_first_run {
            info!(
                "Initial sync merged {} items without notification",
                delta.len()
            );
            false
        } else {
            self.announce(&delta).await
        };

        info!(
            "Merged {} new items ({} total, notified: {})",
            delta.len(),
            total_items,
            notified
        );
        self.emit_event(SyncEvent::Merged {
            new_items: delta.len(),
            total_items,
            notified,
        });

        Ok(CycleOutcome::Merged {
            items: delta,
            notified,
        })
    }

    /// Save a state, reporting failure as an event
    async fn persist(&self, state: &SyncState) -> Result<()> {
        if let Err(e) = self.state_store.save(state).await {
            error!("Failed to persist sync state: {}", e);
            self.emit_event(SyncEvent::PersistFailed {
                error: e.to_string(),
            });
            return Err(match e {
                Error::Persistence(_) => e,
                other => Error::persistence(other.to_string()),
            });
        }
        Ok(())
    }

    /// Send one notification for the batch; failures are logged, not propagated
    async fn announce(&self, delta: &[Item]) -> bool {
        let notification = compose_batch(delta);
        match self
            .notifier
            .notify(&notification.subject, &notification.body)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send notification for {} items: {}", delta.len(), e);
                self.emit_event(SyncEvent::NotifyFailed {
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Emit an engine event
    pub(crate) fn emit_event(&self, event: SyncEvent) {
        // A closed channel means nobody is listening; that is fine
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
