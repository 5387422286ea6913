// # YouTube Feed Client
//
// This crate provides the YouTube Data API v3 feed client for vidsync.
//
// ## Behavior
//
// - Resolves a channel id to its uploads playlist once per process
// - Fetches the whole uploads playlist every cycle, following `nextPageToken`
// - Returns either every page or an error; never a partial listing
// - One HTTP timeout per request (30 seconds by default)
// - No retry, backoff or caching (the scheduler's next tick is the retry)
//
// ## Security Requirements
//
// - API key NEVER appears in logs or error messages
// - API key MUST be provided via configuration or environment only
//
// ## API Reference
//
// - Channels: GET `/channels?part=contentDetails&id=...`
// - Playlist items: GET `/playlistItems?part=snippet,contentDetails&playlistId=...&pageToken=...`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::time::Duration;
use vidsync_core::config::FeedConfig;
use vidsync_core::traits::{FeedClient, FeedClientFactory, FeedId, RawFeedEntry};
use vidsync_core::{Error, Result};

/// Public watch URL prefix for a video id
const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// Largest page the playlistItems endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 50;

/// YouTube Data API v3 feed client
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct YoutubeFeedClient {
    /// API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// API base URL, without trailing slash
    api_base: String,

    /// maxResults for playlistItems
    page_size: u32,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for YoutubeFeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeFeedClient")
            .field("api_key", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl YoutubeFeedClient {
    /// Create a new YouTube feed client
    ///
    /// # Parameters
    ///
    /// - `api_key`: YouTube Data API key
    /// - `api_base`: API base URL (e.g. `https://www.googleapis.com/youtube/v3`)
    /// - `page_size`: Entries requested per page, 1..=50
    /// - `timeout`: Per-request HTTP timeout
    ///
    /// # Errors
    ///
    /// `Error::Config` if the key is empty, the page size is out of range,
    /// or the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        page_size: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("YouTube API key cannot be empty"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::config(format!(
                "YouTube page size must be between 1 and {}. Got: {}",
                MAX_PAGE_SIZE, page_size
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            page_size,
            client,
        })
    }

    /// Build a client from a `FeedConfig::Youtube`
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        match config {
            FeedConfig::Youtube {
                api_key,
                api_base,
                page_size,
                request_timeout_secs,
                ..
            } => Self::new(
                api_key.clone(),
                api_base.clone(),
                *page_size,
                Duration::from_secs(*request_timeout_secs),
            ),
            _ => Err(Error::config("Invalid config for YouTube feed client")),
        }
    }

    /// GET `{api_base}/{endpoint}` with the key appended, decoding the JSON body
    ///
    /// Transport failures and non-2xx statuses are returned as `ApiFailure`
    /// so that callers can decide which error kind they map to.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> std::result::Result<T, ApiFailure> {
        let url = format!("{}/{}", self.api_base, endpoint);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            // The request URL carries the key; strip it from the error
            .map_err(|e| ApiFailure::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(ApiFailure::Status(status.as_u16(), api_error_message(&error_text)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiFailure::Malformed(e.without_url().to_string()))
    }
}

/// A failed API call, before it is classified
#[derive(Debug)]
enum ApiFailure {
    Transport(String),
    Status(u16, String),
    Malformed(String),
}

impl ApiFailure {
    /// Classify a failed channel lookup
    ///
    /// Rejected credentials and unknown channels are configuration errors.
    /// Everything else is a fetch error.
    fn into_resolve_error(self, channel_id: &str) -> Error {
        match self {
            ApiFailure::Status(code @ (400 | 401 | 403), message) => Error::config(format!(
                "YouTube rejected the channel lookup ({}): {}",
                code, message
            )),
            ApiFailure::Status(404, _) => {
                Error::config(format!("YouTube channel not found: {}", channel_id))
            }
            other => Error::fetch(format!("Channel lookup failed: {}", other)),
        }
    }

    fn into_fetch_error(self, page: usize) -> Error {
        Error::fetch(format!("Playlist page {} failed: {}", page, self))
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiFailure::Transport(e) => write!(f, "HTTP request failed: {}", e),
            ApiFailure::Status(code, message) => write!(f, "HTTP {}: {}", code, message),
            ApiFailure::Malformed(e) => write!(f, "Failed to parse response: {}", e),
        }
    }
}

/// Pull `error.message` out of a Google API error body, falling back to the raw text
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Channel {
    content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemListResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    published_at: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: Option<String>,
}

impl PlaylistItem {
    /// Map to a raw entry; `None` when the item has no video id
    fn into_entry(self) -> Option<RawFeedEntry> {
        let id = self.content_details.video_id.filter(|id| !id.is_empty())?;
        let published_at = self
            .snippet
            .published_at
            .as_deref()
            .and_then(|ts| ts.parse::<DateTime<Utc>>().ok());
        let thumbnail_url = self
            .snippet
            .thumbnails
            .and_then(|t| t.high)
            .map(|high| high.url);

        Some(RawFeedEntry {
            id,
            title: self.snippet.title,
            description: self.snippet.description,
            published_at,
            thumbnail_url,
        })
    }
}

/// Convert one page into raw entries, preserving API order
fn entries_from_page(items: Vec<PlaylistItem>, page: usize) -> Vec<RawFeedEntry> {
    let total = items.len();
    let entries: Vec<RawFeedEntry> = items
        .into_iter()
        .filter_map(PlaylistItem::into_entry)
        .collect();

    let dropped = total - entries.len();
    if dropped > 0 {
        tracing::warn!(
            "Dropped {} playlist entries without a video id on page {}",
            dropped,
            page
        );
    }
    entries
}

#[async_trait]
impl FeedClient for YoutubeFeedClient {
    async fn resolve_feed_id(&self, channel_id: &str) -> Result<FeedId> {
        tracing::debug!("Resolving uploads playlist for channel {}", channel_id);

        let response: ChannelListResponse = self
            .get_json(
                "channels",
                &[("part", "contentDetails"), ("id", channel_id)],
            )
            .await
            .map_err(|failure| failure.into_resolve_error(channel_id))?;

        let channel = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::config(format!("YouTube channel not found: {}", channel_id)))?;

        channel
            .content_details
            .related_playlists
            .uploads
            .filter(|uploads| !uploads.is_empty())
            .map(FeedId::new)
            .ok_or_else(|| {
                Error::config(format!(
                    "YouTube channel {} has no uploads playlist",
                    channel_id
                ))
            })
    }

    async fn fetch_all_items(&self, feed_id: &FeedId) -> Result<Vec<RawFeedEntry>> {
        let page_size = self.page_size.to_string();
        let mut entries = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut page_token: Option<String> = None;
        let mut page = 1;

        loop {
            let mut query = vec![
                ("part", "snippet,contentDetails"),
                ("playlistId", feed_id.as_str()),
                ("maxResults", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response: PlaylistItemListResponse = self
                .get_json("playlistItems", &query)
                .await
                .map_err(|failure| failure.into_fetch_error(page))?;

            entries.extend(entries_from_page(response.items, page));

            match response.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(Error::fetch(format!(
                            "Playlist {} repeated page token on page {}",
                            feed_id, page
                        )));
                    }
                    page_token = Some(token);
                    page += 1;
                }
                None => break,
            }
        }

        tracing::debug!(
            "Fetched {} entries from playlist {} in {} pages",
            entries.len(),
            feed_id,
            page
        );
        Ok(entries)
    }

    fn source_url(&self, item_id: &str) -> String {
        format!("{}{}", WATCH_URL_BASE, item_id)
    }

    fn client_name(&self) -> &'static str {
        "youtube"
    }
}

/// Factory for creating YouTube feed clients
pub struct YoutubeFactory;

impl FeedClientFactory for YoutubeFactory {
    fn create(&self, config: &FeedConfig) -> Result<Box<dyn FeedClient>> {
        config.validate()?;
        Ok(Box::new(YoutubeFeedClient::from_config(config)?))
    }
}

/// Register the YouTube feed client with a registry
///
/// # Example
///
/// ```rust
/// use vidsync_core::Registry;
///
/// let registry = Registry::with_builtin_stores();
/// vidsync_feed_youtube::register(&registry);
/// assert!(registry.has_feed_client("youtube"));
/// ```
pub fn register(registry: &vidsync_core::Registry) {
    registry.register_feed_client("youtube", Box::new(YoutubeFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> YoutubeFeedClient {
        YoutubeFeedClient::new(
            "secret_key_12345",
            "https://api.test/youtube/v3/",
            50,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn api_key_not_exposed_in_debug() {
        let debug_str = format!("{:?}", client());
        assert!(!debug_str.contains("secret_key"));
        assert!(debug_str.contains("YoutubeFeedClient"));
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base() {
        assert_eq!(client().api_base, "https://api.test/youtube/v3");
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = YoutubeFeedClient::new("", "https://api.test", 50, Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn page_size_above_api_limit_is_rejected() {
        let err = YoutubeFeedClient::new("key", "https://api.test", 51, Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn source_url_is_watch_url() {
        assert_eq!(
            client().source_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn playlist_page_maps_to_entries() {
        let page: PlaylistItemListResponse = serde_json::from_str(
            r#"{
              "nextPageToken": "CAUQAA",
              "items": [
                {
                  "snippet": {
                    "title": "Episode 2",
                    "description": "Second",
                    "publishedAt": "2024-03-02T09:30:00Z",
                    "thumbnails": {
                      "default": { "url": "https://i.ytimg.com/vi/v2/default.jpg" },
                      "high": { "url": "https://i.ytimg.com/vi/v2/hqdefault.jpg" }
                    }
                  },
                  "contentDetails": { "videoId": "v2" }
                },
                {
                  "snippet": { "title": "Episode 1" },
                  "contentDetails": { "videoId": "v1" }
                }
              ]
            }"#,
        )
        .unwrap();

        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
        let entries = entries_from_page(page.items, 1);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "v2");
        assert_eq!(entries[0].title, "Episode 2");
        assert_eq!(
            entries[0].thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/v2/hqdefault.jpg")
        );
        assert_eq!(
            entries[0].published_at.map(|t| t.to_rfc3339()),
            Some("2024-03-02T09:30:00+00:00".to_string())
        );

        assert_eq!(entries[1].id, "v1");
        assert_eq!(entries[1].description, "");
        assert_eq!(entries[1].thumbnail_url, None);
        assert_eq!(entries[1].published_at, None);
    }

    #[test]
    fn entries_without_video_id_are_dropped() {
        let page: PlaylistItemListResponse = serde_json::from_str(
            r#"{
              "items": [
                { "snippet": { "title": "Private video" }, "contentDetails": {} },
                { "snippet": { "title": "Kept" }, "contentDetails": { "videoId": "v9" } },
                { "snippet": { "title": "Blank" }, "contentDetails": { "videoId": "" } }
              ]
            }"#,
        )
        .unwrap();

        let entries = entries_from_page(page.items, 1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "v9");
    }

    #[test]
    fn missing_items_is_an_empty_page() {
        let page: PlaylistItemListResponse = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn unparseable_timestamp_becomes_none() {
        let item: PlaylistItem = serde_json::from_str(
            r#"{ "snippet": { "publishedAt": "yesterday" }, "contentDetails": { "videoId": "v1" } }"#,
        )
        .unwrap();
        assert_eq!(item.into_entry().unwrap().published_at, None);
    }

    #[test]
    fn offset_timestamp_is_normalized_to_utc() {
        let item: PlaylistItem = serde_json::from_str(
            r#"{ "snippet": { "publishedAt": "2024-03-01T09:30:00+02:00" }, "contentDetails": { "videoId": "v1" } }"#,
        )
        .unwrap();
        let expected: DateTime<Utc> = "2024-03-01T07:30:00Z".parse().unwrap();
        assert_eq!(item.into_entry().unwrap().published_at, Some(expected));
    }

    #[test]
    fn google_error_message_is_extracted() {
        let body = r#"{"error":{"code":403,"message":"API key not valid."}}"#;
        assert_eq!(api_error_message(body), "API key not valid.");
        assert_eq!(api_error_message(" Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn lookup_failures_are_classified() {
        assert!(matches!(
            ApiFailure::Status(403, "forbidden".into()).into_resolve_error("UC1"),
            Error::Config(_)
        ));
        assert!(matches!(
            ApiFailure::Status(404, String::new()).into_resolve_error("UC1"),
            Error::Config(_)
        ));
        assert!(matches!(
            ApiFailure::Status(503, String::new()).into_resolve_error("UC1"),
            Error::Fetch(_)
        ));
        assert!(matches!(
            ApiFailure::Transport("timed out".into()).into_resolve_error("UC1"),
            Error::Fetch(_)
        ));
    }

    #[test]
    fn factory_rejects_other_configs() {
        let config = FeedConfig::Custom {
            factory: "vimeo".to_string(),
            channel_id: "c".to_string(),
            config: serde_json::Value::Null,
        };
        assert!(YoutubeFactory.create(&config).is_err());
    }

    #[test]
    fn factory_builds_from_youtube_config() {
        let client = YoutubeFactory
            .create(&FeedConfig::youtube("key", "UC123"))
            .unwrap();
        assert_eq!(client.client_name(), "youtube");
    }
}
