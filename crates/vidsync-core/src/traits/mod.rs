//! Core traits for vidsync
//!
//! This module defines the abstract interfaces the engine is built against.
//!
//! - [`FeedClient`]: Resolve and page through an upload feed
//! - [`StateStore`]: Durable whole-record state persistence
//! - [`NotificationSink`]: Announce merged batches

pub mod feed_client;
pub mod notification_sink;
pub mod state_store;

pub use feed_client::{FeedClient, FeedClientFactory, FeedId, RawFeedEntry};
pub use notification_sink::NotificationSink;
pub use state_store::{Item, StateStore, StateStoreFactory, SyncState};
