//! Configuration types for vidsync
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default YouTube Data API v3 endpoint
pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Main vidsync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Feed client configuration
    pub feed: FeedConfig,

    /// State store configuration
    pub state_store: StateStoreConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a configuration for a feed with default store and engine settings
    pub fn new(feed: FeedConfig) -> Self {
        Self {
            feed,
            state_store: StateStoreConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.feed.validate()?;
        self.state_store.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Feed client configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedConfig {
    /// YouTube Data API v3
    Youtube {
        /// API key (never logged)
        api_key: String,
        /// Channel whose uploads are synced
        channel_id: String,
        /// API base URL
        #[serde(default = "default_api_base")]
        api_base: String,
        /// Items requested per page (1..=50)
        #[serde(default = "default_page_size")]
        page_size: u32,
        /// Timeout for each HTTP request (in seconds)
        #[serde(default = "default_request_timeout_secs")]
        request_timeout_secs: u64,
    },

    /// Custom feed client
    Custom {
        /// Factory name to use
        factory: String,
        /// Channel whose items are synced
        channel_id: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

// Hand-written so the API key never reaches logs.
impl std::fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedConfig::Youtube {
                channel_id,
                api_base,
                page_size,
                request_timeout_secs,
                ..
            } => f
                .debug_struct("Youtube")
                .field("api_key", &"<REDACTED>")
                .field("channel_id", channel_id)
                .field("api_base", api_base)
                .field("page_size", page_size)
                .field("request_timeout_secs", request_timeout_secs)
                .finish(),
            FeedConfig::Custom {
                factory,
                channel_id,
                config,
            } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("channel_id", channel_id)
                .field("config", config)
                .finish(),
        }
    }
}

impl FeedConfig {
    /// YouTube feed with default endpoint, page size and timeout
    pub fn youtube(api_key: impl Into<String>, channel_id: impl Into<String>) -> Self {
        FeedConfig::Youtube {
            api_key: api_key.into(),
            channel_id: channel_id.into(),
            api_base: default_api_base(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Validate the feed configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            FeedConfig::Youtube {
                api_key,
                channel_id,
                api_base,
                page_size,
                request_timeout_secs,
            } => {
                if api_key.is_empty() {
                    return Err(crate::Error::config("YouTube API key cannot be empty"));
                }
                if channel_id.is_empty() {
                    return Err(crate::Error::config("YouTube channel id cannot be empty"));
                }
                if !api_base.starts_with("https://") && !api_base.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "YouTube API base must be an HTTP(S) URL. Got: {}",
                        api_base
                    )));
                }
                if !(1..=50).contains(page_size) {
                    return Err(crate::Error::config(format!(
                        "YouTube page size must be between 1 and 50. Got: {}",
                        page_size
                    )));
                }
                if *request_timeout_secs == 0 {
                    return Err(crate::Error::config("Request timeout must be > 0"));
                }
                Ok(())
            }
            FeedConfig::Custom {
                factory,
                channel_id,
                ..
            } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom feed client factory cannot be empty",
                    ));
                }
                if channel_id.is_empty() {
                    return Err(crate::Error::config("Channel id cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the feed client type name
    pub fn type_name(&self) -> &str {
        match self {
            FeedConfig::Youtube { .. } => "youtube",
            FeedConfig::Custom { factory, .. } => factory,
        }
    }

    /// Channel whose feed is synced
    pub fn channel_id(&self) -> &str {
        match self {
            FeedConfig::Youtube { channel_id, .. } | FeedConfig::Custom { channel_id, .. } => {
                channel_id
            }
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_YOUTUBE_API_BASE.to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// State store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based state store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    #[default]
    Memory,

    /// Custom state store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StateStoreConfig {
    /// Validate the state store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StateStoreConfig::File { path } if path.is_empty() => {
                Err(crate::Error::config("State file path cannot be empty"))
            }
            StateStoreConfig::Custom { factory, .. } if factory.is_empty() => Err(
                crate::Error::config("Custom state store factory cannot be empty"),
            ),
            _ => Ok(()),
        }
    }

    /// Get the state store type name
    pub fn type_name(&self) -> &str {
        match self {
            StateStoreConfig::File { .. } => "file",
            StateStoreConfig::Memory => "memory",
            StateStoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Engine and scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interval between sync cycles (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Whether the initial merge of an unseeded state produces a notification
    ///
    /// An unseeded state is one with no `lastSeenId`: no poll has ever
    /// completed against it. With this off, the existing feed is merged
    /// silently and only later uploads are announced.
    #[serde(default = "default_notify_on_first_run")]
    pub notify_on_first_run: bool,

    /// Delay before the first cycle (in seconds)
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            notify_on_first_run: default_notify_on_first_run(),
            startup_delay_secs: default_startup_delay_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_notify_on_first_run() -> bool {
    true
}

fn default_startup_delay_secs() -> u64 {
    0
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_five_minute_poll() {
        let engine = EngineConfig::default();
        assert_eq!(engine.poll_interval(), Duration::from_secs(300));
        assert!(engine.notify_on_first_run);
    }

    #[test]
    fn youtube_config_requires_credentials() {
        assert!(FeedConfig::youtube("", "UC123").validate().is_err());
        assert!(FeedConfig::youtube("key", "").validate().is_err());
        assert!(FeedConfig::youtube("key", "UC123").validate().is_ok());
    }

    #[test]
    fn page_size_is_bounded_by_api_maximum() {
        let config = FeedConfig::Youtube {
            api_key: "key".to_string(),
            channel_id: "UC123".to_string(),
            api_base: default_api_base(),
            page_size: 51,
            request_timeout_secs: 30,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = FeedConfig::youtube("super-secret-key", "UC123");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("UC123"));
    }

    #[test]
    fn deserializes_tagged_config_with_defaults() {
        let json = r#"{
            "feed": { "type": "youtube", "api_key": "k", "channel_id": "UC1" },
            "state_store": { "type": "file", "path": "/tmp/posts.json" }
        }"#;
        let config: SyncConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.feed.type_name(), "youtube");
        assert_eq!(config.feed.channel_id(), "UC1");
        assert_eq!(config.state_store.type_name(), "file");
        assert_eq!(config.engine.poll_interval_secs, 300);
    }

    #[test]
    fn empty_file_path_is_rejected() {
        let store = StateStoreConfig::File {
            path: String::new(),
        };
        assert!(store.validate().is_err());
    }
}
