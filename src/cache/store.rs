//! Keyed in-memory storage for computed snapshots.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::stats::StatSnapshot;

/// Whether a cached snapshot is still within its TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
  Fresh,
  Stale,
}

/// Classify a snapshot's age against the configured TTL.
pub fn classify_staleness(snapshot: &StatSnapshot, now: DateTime<Utc>, ttl: Duration) -> Freshness {
  if now - snapshot.computed_at > ttl {
    Freshness::Stale
  } else {
    Freshness::Fresh
  }
}

/// Holds at most one snapshot per user key.
///
/// Reads are non-blocking and O(1); writes replace the whole snapshot
/// atomically, so a reader sees either the old or the new one, never a mix.
/// Mutation for different keys never contends.
pub struct SnapshotStore {
  entries: DashMap<String, Arc<StatSnapshot>>,
}

impl SnapshotStore {
  pub fn new() -> Self {
    Self {
      entries: DashMap::new(),
    }
  }

  pub fn get(&self, user_key: &str) -> Option<Arc<StatSnapshot>> {
    self.entries.get(user_key).map(|entry| Arc::clone(&entry))
  }

  /// Replace the snapshot for a key, last-writer-wins by `computed_at`.
  ///
  /// Overlapping refreshes cannot happen under single-flight, but if one ever
  /// completed out of order this keeps `computed_at` strictly increasing.
  /// Returns whether the snapshot was stored.
  pub fn put(&self, user_key: &str, snapshot: Arc<StatSnapshot>) -> bool {
    match self.entries.entry(user_key.to_string()) {
      Entry::Occupied(mut occupied) => {
        if snapshot.computed_at <= occupied.get().computed_at {
          return false;
        }
        occupied.insert(snapshot);
        true
      }
      Entry::Vacant(vacant) => {
        vacant.insert(snapshot);
        true
      }
    }
  }
}

impl Default for SnapshotStore {
  fn default() -> Self {
    Self::new()
  }
}
