//! Batch notifications
//!
//! A merge produces one notification for the whole batch, never one per item.
//! This module formats that notification and provides a sink that only writes
//! it to the log, for deployments without an outbound channel.

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::traits::{Item, NotificationSink};

/// Subject line for a merged batch
pub const BATCH_SUBJECT: &str = "New YouTube Uploads Synced";

const BATCH_PREAMBLE: &str = "New videos auto-published as blog posts:";

/// A formatted notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

/// Format one notification for a batch of newly merged items (newest first)
pub fn compose_batch(items: &[Item]) -> Notification {
    let entries = items
        .iter()
        .map(|item| format!("{} ({})", item.title, item.source_url))
        .collect::<Vec<_>>()
        .join("\n\n");

    Notification {
        subject: BATCH_SUBJECT.to_string(),
        body: format!("{}\n\n{}", BATCH_PREAMBLE, entries),
    }
}

/// Notification sink that writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        info!(subject, "{}", body);
        Ok(())
    }
}
