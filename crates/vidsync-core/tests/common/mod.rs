//! Test doubles and common utilities for sync contract tests
//!
//! This module provides minimal test doubles that record how the engine
//! talks to its collaborators.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use vidsync_core::error::{Error, Result};
use vidsync_core::traits::{
    FeedClient, FeedId, NotificationSink, RawFeedEntry, StateStore, SyncState,
};
use vidsync_core::{EngineConfig, ItemsReader, MemoryStateStore, SyncEngine, SyncEvent};

pub const CHANNEL_ID: &str = "UC_test_channel";
pub const FEED_ID: &str = "UU_test_channel";

/// Raw entries with generated titles, in the given (newest-first) order
pub fn entries(ids: &[&str]) -> Vec<RawFeedEntry> {
    ids.iter()
        .map(|id| RawFeedEntry::new(*id, format!("Video {}", id)))
        .collect()
}

pub fn url(id: &str) -> String {
    format!("https://videos.test/watch?v={}", id)
}

/// A feed client whose snapshots are scripted by the test
///
/// Each `fetch_all_items` pops the next scripted response; once the script
/// is exhausted the last snapshot is repeated.
#[derive(Clone)]
pub struct ScriptedFeedClient {
    script: Arc<Mutex<VecDeque<Result<Vec<RawFeedEntry>>>>>,
    last: Arc<Mutex<Vec<RawFeedEntry>>>,
    resolve_ok: Arc<AtomicBool>,
    resolve_calls: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    fetch_delay_ms: u64,
}

impl ScriptedFeedClient {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            last: Arc::new(Mutex::new(Vec::new())),
            resolve_ok: Arc::new(AtomicBool::new(true)),
            resolve_calls: Arc::new(AtomicUsize::new(0)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            fetch_delay_ms: 0,
        }
    }

    /// Client that always serves the same snapshot
    pub fn serving(ids: &[&str]) -> Self {
        let client = Self::new();
        *client.last.lock().unwrap() = entries(ids);
        client
    }

    /// Client whose channel cannot be resolved
    pub fn unresolvable() -> Self {
        let client = Self::new();
        client.resolve_ok.store(false, Ordering::SeqCst);
        client
    }

    /// Make every fetch take this long
    pub fn with_fetch_delay(mut self, millis: u64) -> Self {
        self.fetch_delay_ms = millis;
        self
    }

    /// Queue a successful snapshot
    pub fn push_snapshot(&self, ids: &[&str]) {
        self.script.lock().unwrap().push_back(Ok(entries(ids)));
    }

    /// Queue a snapshot built from explicit entries
    pub fn push_entries(&self, entries: Vec<RawFeedEntry>) {
        self.script.lock().unwrap().push_back(Ok(entries));
    }

    /// Queue a failed fetch
    pub fn push_failure(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(Error::fetch(message)));
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FeedClient for ScriptedFeedClient {
    async fn resolve_feed_id(&self, channel_id: &str) -> Result<FeedId> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.resolve_ok.load(Ordering::SeqCst) {
            assert_eq!(channel_id, CHANNEL_ID);
            Ok(FeedId::new(FEED_ID))
        } else {
            Err(Error::config("Channel not found"))
        }
    }

    async fn fetch_all_items(&self, feed_id: &FeedId) -> Result<Vec<RawFeedEntry>> {
        assert_eq!(feed_id.as_str(), FEED_ID);
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if self.fetch_delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.fetch_delay_ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(snapshot)) => {
                *self.last.lock().unwrap() = snapshot.clone();
                Ok(snapshot)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }

    fn source_url(&self, item_id: &str) -> String {
        url(item_id)
    }

    fn client_name(&self) -> &'static str {
        "scripted"
    }
}

/// A notification sink that records every call
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<(String, String)>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier whose every call fails (after being recorded)
    pub fn failing() -> Self {
        let notifier = Self::new();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::notification("mail relay unavailable"));
        }
        Ok(())
    }
}

/// A state store wrapper whose saves can be made to fail
#[derive(Clone)]
pub struct FlakyStateStore {
    inner: MemoryStateStore,
    fail_saves: Arc<AtomicBool>,
    save_calls: Arc<AtomicUsize>,
}

impl FlakyStateStore {
    pub fn new(inner: MemoryStateStore) -> Self {
        Self {
            inner,
            fail_saves: Arc::new(AtomicBool::new(false)),
            save_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StateStore for FlakyStateStore {
    async fn load(&self) -> Result<SyncState> {
        self.inner.load().await
    }

    async fn save(&self, state: &SyncState) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::persistence("disk full"));
        }
        self.inner.save(state).await
    }

    fn store_name(&self) -> &'static str {
        "flaky"
    }
}

/// Engine configuration for tests
pub fn test_config(notify_on_first_run: bool) -> EngineConfig {
    EngineConfig {
        poll_interval_secs: 300,
        notify_on_first_run,
        startup_delay_secs: 0,
        event_channel_capacity: 100,
    }
}

/// Everything a test needs to drive and observe an engine
pub struct Harness {
    pub engine: SyncEngine,
    pub reader: ItemsReader,
    pub events: tokio::sync::mpsc::Receiver<SyncEvent>,
    pub feed: ScriptedFeedClient,
    pub store: FlakyStateStore,
    pub memory: MemoryStateStore,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new(feed: ScriptedFeedClient, memory: MemoryStateStore, config: EngineConfig) -> Self {
        Self::with_notifier(feed, memory, RecordingNotifier::new(), config)
    }

    pub fn with_notifier(
        feed: ScriptedFeedClient,
        memory: MemoryStateStore,
        notifier: RecordingNotifier,
        config: EngineConfig,
    ) -> Self {
        let store = FlakyStateStore::new(memory.clone());
        let (engine, reader, events) = SyncEngine::new(
            Box::new(feed.clone()),
            Box::new(store.clone()),
            Box::new(notifier.clone()),
            &config,
        )
        .expect("engine construction succeeds");

        Self {
            engine,
            reader,
            events,
            feed,
            store,
            memory,
            notifier,
        }
    }

    pub fn feed_id() -> FeedId {
        FeedId::new(FEED_ID)
    }

    /// Ids currently persisted, newest first
    pub async fn persisted_ids(&self) -> Vec<String> {
        self.memory
            .load()
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|item| item.id)
            .collect()
    }

    /// Ids visible to readers, newest first
    pub fn reader_ids(&self) -> Vec<String> {
        self.reader.items().iter().map(|item| item.id.clone()).collect()
    }

    /// Drain every event emitted so far
    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

/// A seeded state with the given ids (newest first)
pub fn seeded_state(ids: &[&str]) -> SyncState {
    SyncState {
        items: ids
            .iter()
            .map(|id| vidsync_core::Item {
                id: id.to_string(),
                title: format!("Video {}", id),
                description: String::new(),
                published_at: None,
                thumbnail_url: None,
                source_url: url(id),
            })
            .collect(),
        last_seen_id: ids.first().map(|id| id.to_string()),
    }
}
