// # vidsync-core
//
// Core library for the vidsync upload-feed synchronizer.
//
// ## Architecture Overview
//
// This library keeps a local, durable copy of a channel's upload feed:
// - **FeedClient**: Trait for resolving and paging through an external feed
// - **StateStore**: Trait for whole-record persistence of synced items
// - **NotificationSink**: Trait for announcing newly merged batches
// - **SyncEngine**: One load → fetch → merge → save → notify cycle
// - **Scheduler**: Runs the engine immediately, then on a fixed interval
// - **ItemsReader**: Read-only view of the last successfully merged items
// - **Registry**: Plugin-based registry for feed clients and state stores
//
// ## Design Principles
//
// 1. **Full-snapshot dedup**: New items are found by id against every known
//    item, never by feed position or cursor alone
// 2. **Whole-record writes**: State is replaced atomically, never patched
// 3. **One writer**: A single task owns the state; cycles never overlap
// 4. **Library-First**: The daemon is a thin layer over this crate

pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod reader;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{EngineConfig, FeedConfig, StateStoreConfig, SyncConfig};
pub use engine::{CycleOutcome, SyncEngine, SyncEvent};
pub use error::{Error, Result};
pub use notify::TracingNotifier;
pub use reader::{ItemsReader, ItemsSnapshot};
pub use registry::Registry;
pub use scheduler::{Scheduler, SchedulerExit};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{FeedClient, FeedId, Item, NotificationSink, RawFeedEntry, StateStore, SyncState};
