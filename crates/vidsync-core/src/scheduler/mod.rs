//! Periodic driver for the sync engine
//!
//! One long-lived task: resolve the feed once, run a cycle immediately, then
//! one cycle per interval until shutdown. A cycle is always awaited to
//! completion before the next tick is taken, so cycles never overlap and a
//! shutdown request is only honored between cycles.

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::engine::{CycleOutcome, SyncEngine, SyncEvent};
use crate::error::Error;

/// Why the scheduler returned
#[derive(Debug)]
pub enum SchedulerExit {
    /// Shutdown was requested
    Stopped,

    /// The feed could not be resolved; sync stays off for this process
    Disabled(Error),
}

/// Scheduler owning a [`SyncEngine`]
pub struct Scheduler {
    engine: SyncEngine,
    channel_id: String,
    interval: Duration,
    startup_delay: Duration,
}

impl Scheduler {
    /// Create a scheduler for a channel
    pub fn new(engine: SyncEngine, channel_id: impl Into<String>, config: &EngineConfig) -> Self {
        Self {
            engine,
            channel_id: channel_id.into(),
            interval: config.poll_interval(),
            startup_delay: Duration::from_secs(config.startup_delay_secs),
        }
    }

    /// Override the poll interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until Ctrl-C
    pub async fn run(&self) -> SchedulerExit {
        self.run_internal(None).await
    }

    /// Run until the given signal fires (or its sender is dropped)
    pub async fn run_with_shutdown(&self, shutdown_rx: oneshot::Receiver<()>) -> SchedulerExit {
        self.run_internal(Some(shutdown_rx)).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> SchedulerExit {
        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        // Readers get the persisted items even if sync never starts
        if let Err(e) = self.engine.prime().await {
            warn!("Could not load persisted items for readers: {}", e);
        }

        if self.interval.is_zero() {
            return self.disabled(Error::config("Poll interval must be greater than 0"));
        }

        if !self.startup_delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.startup_delay) => {}
                _ = &mut shutdown => return self.stopped("Shutdown during startup delay"),
            }
        }

        let feed_id = match self.engine.resolve_feed(&self.channel_id).await {
            Ok(feed_id) => feed_id,
            Err(e) => {
                error!("Could not resolve channel {}", self.channel_id);
                return self.disabled(e);
            }
        };

        info!("Polling feed {} every {:?}", feed_id, self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // First tick completes immediately
                _ = ticker.tick() => {
                    match self.engine.run_once(&feed_id).await {
                        Ok(CycleOutcome::Merged { items, notified }) => {
                            debug!("Cycle merged {} items (notified: {})", items.len(), notified);
                        }
                        Ok(outcome) => debug!("Cycle finished: {:?}", outcome),
                        Err(e) => warn!("Sync cycle failed, retrying next tick: {}", e),
                    }
                }

                _ = &mut shutdown => {
                    return self.stopped("Shutdown signal");
                }
            }
        }
    }

    fn disabled(&self, e: Error) -> SchedulerExit {
        error!("Sync disabled: {}", e);
        self.engine.emit_event(SyncEvent::Disabled {
            reason: e.to_string(),
        });
        SchedulerExit::Disabled(e)
    }

    fn stopped(&self, reason: &str) -> SchedulerExit {
        info!("Scheduler stopped: {}", reason);
        self.engine.emit_event(SyncEvent::Stopped {
            reason: reason.to_string(),
        });
        SchedulerExit::Stopped
    }
}
