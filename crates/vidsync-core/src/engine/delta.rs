//! Delta computation and merge
//!
//! Pure functions over a loaded `SyncState` and a fetched snapshot. Dedup is
//! always done against the full set of known ids; the position of an entry in
//! the feed is never trusted.

use std::collections::HashSet;

use crate::traits::{Item, RawFeedEntry, SyncState};

/// Items in `raw` not yet present in `state`, in feed order (newest first)
///
/// The known-id set grows as entries are accepted, so an id the API repeats
/// within one snapshot yields a single item (the first occurrence).
pub fn compute_delta<F>(state: &SyncState, raw: &[RawFeedEntry], source_url: F) -> Vec<Item>
where
    F: Fn(&str) -> String,
{
    let mut known: HashSet<&str> = state.known_ids();
    let mut delta = Vec::new();

    for entry in raw {
        if !known.insert(entry.id.as_str()) {
            continue;
        }
        delta.push(Item {
            id: entry.id.clone(),
            title: entry.title.clone(),
            description: entry.description.clone(),
            published_at: entry.published_at,
            thumbnail_url: entry.thumbnail_url.clone(),
            source_url: source_url(&entry.id),
        });
    }

    delta
}

/// New state with `delta` prepended and the cursor moved to `newest_id`
///
/// Previously known items keep their relative order.
pub fn merge(state: &SyncState, delta: &[Item], newest_id: &str) -> SyncState {
    let mut items = Vec::with_capacity(delta.len() + state.items.len());
    items.extend_from_slice(delta);
    items.extend_from_slice(&state.items);

    SyncState {
        items,
        last_seen_id: Some(newest_id.to_string()),
    }
}
