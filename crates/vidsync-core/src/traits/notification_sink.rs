// # Notification Sink Trait
//
// The callback through which a merged batch is announced.
//
// Delivery is best-effort: the engine logs a failed `notify` and moves on.
// The merge that produced the batch is already durable and is never rolled
// back.

use async_trait::async_trait;

/// Trait for notification sinks
///
/// ## Forbidden Capabilities
/// - ❌ Retry delivery by re-triggering a sync
/// - ❌ Access the state store
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Handed off to the transport
    /// - `Err(Error::Notification)`: Delivery failed (logged by the caller)
    async fn notify(&self, subject: &str, body: &str) -> Result<(), crate::Error>;
}
