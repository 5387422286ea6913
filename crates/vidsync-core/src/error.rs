//! Error types for vidsync
//!
//! The variants follow the failure taxonomy of a sync cycle: a feed that
//! cannot be resolved (`Config`), a page fetch that failed (`Fetch`), a state
//! record that could not be read or written (`Persistence`) and a notification
//! that could not be delivered (`Notification`).

use thiserror::Error;

/// Result type alias for vidsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vidsync
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors, including a feed that cannot be resolved
    #[error("Configuration error: {0}")]
    Config(String),

    /// A feed page request failed or returned something unusable
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The state record could not be read or replaced
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The notification sink rejected a batch
    #[error("Notification error: {0}")]
    Notification(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Feed-client specific error
    #[error("Feed client error ({client}): {message}")]
    Provider {
        /// Feed client name
        client: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// Create a feed-client specific error
    pub fn provider(client: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            client: client.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the sync subsystem can never make progress
    /// without operator intervention
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_config_errors_are_permanent() {
        assert!(Error::config("channel not found").is_permanent());
        assert!(!Error::fetch("timeout").is_permanent());
        assert!(!Error::persistence("disk full").is_permanent());
        assert!(!Error::notification("smtp down").is_permanent());
    }

    #[test]
    fn provider_error_names_the_client() {
        let err = Error::provider("youtube", "quota exceeded");
        assert_eq!(err.to_string(), "Feed client error (youtube): quota exceeded");
    }
}
