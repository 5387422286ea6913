// # Feed Client Trait
//
// Defines the interface to the external video-hosting API.
//
// ## Implementations
//
// - YouTube Data API v3: `vidsync-feed-youtube` crate
//
// ## Usage
//
// ```rust,ignore
// use vidsync_core::FeedClient;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let client = /* FeedClient implementation */;
//
//     // Once per process start
//     let feed_id = client.resolve_feed_id("UC_x5XG1OV2P6uZZ5FSM9Ttw").await?;
//
//     // Every cycle: the full snapshot, newest first
//     let entries = client.fetch_all_items(&feed_id).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Identifier of a paginated upload feed, as returned by `resolve_feed_id`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedId(String);

impl FeedId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A feed entry as returned by the external API, before mapping to an `Item`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFeedEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
}

impl RawFeedEntry {
    /// Create an entry with only an id and title (other fields empty)
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            published_at: None,
            thumbnail_url: None,
        }
    }
}

/// Trait for feed client implementations
///
/// # Trust Level: Untrusted
///
/// Feed clients are external integrations:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS calls to their API only
/// - ✅ Follow the API's pagination cursor until it is exhausted
/// - ✅ Bound every request with a timeout
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (the scheduler's next tick is the retry)
/// - ❌ Access the state store
/// - ❌ Decide which entries are new (owned by `SyncEngine`)
/// - ❌ Return a partial listing when any page fails
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Translate a channel identifier into the feed identifier to poll
    ///
    /// # Returns
    ///
    /// - `Ok(FeedId)`: The feed to poll for the rest of the process lifetime
    /// - `Err(Error::Config)`: Channel not found or credentials rejected
    /// - `Err(Error)`: Any other failure
    async fn resolve_feed_id(&self, channel_id: &str) -> Result<FeedId, crate::Error>;

    /// Fetch every page of the feed, concatenated in API order (newest first)
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<RawFeedEntry>)`: The complete snapshot
    /// - `Err(Error::Fetch)`: Any page failed; no entries are returned
    async fn fetch_all_items(&self, feed_id: &FeedId) -> Result<Vec<RawFeedEntry>, crate::Error>;

    /// Public URL for an item id
    fn source_url(&self, item_id: &str) -> String;

    /// Short name for logging
    fn client_name(&self) -> &'static str;
}

/// Helper trait for constructing feed clients from configuration
pub trait FeedClientFactory: Send + Sync {
    /// Create a FeedClient instance from configuration
    fn create(
        &self,
        config: &crate::config::FeedConfig,
    ) -> Result<Box<dyn FeedClient>, crate::Error>;
}
