//! Single-flight refresh coordination.
//!
//! Each user key gets a refresh slot; a refresh may only run while holding
//! that slot's ticket. Background triggers use `try_begin` (losers do
//! nothing), the cold-start path uses `begin` (callers queue up and re-check
//! the store once they hold the ticket). The upstream is paginated and
//! rate-limited, so duplicate concurrent refreshes must never happen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
struct RefreshSlot {
  lock: Arc<AsyncMutex<()>>,
  refreshing: AtomicBool,
  /// Message of the last failed refresh; sticky until the next success.
  last_error: Mutex<Option<String>>,
}

/// Proof that the holder is the only refresh in flight for its key.
///
/// Dropping the ticket without calling `complete` or `fail` releases the slot
/// and leaves the failure state untouched.
pub struct RefreshTicket {
  slot: Arc<RefreshSlot>,
  _guard: OwnedMutexGuard<()>,
}

impl RefreshTicket {
  /// Mark the refresh as succeeded, clearing any sticky failure.
  pub fn complete(self) {
    *self.slot.last_error.lock() = None;
  }

  /// Mark the refresh as failed; reads report the error until a refresh
  /// succeeds.
  pub fn fail(self, message: String) {
    *self.slot.last_error.lock() = Some(message);
  }
}

impl Drop for RefreshTicket {
  fn drop(&mut self) {
    self.slot.refreshing.store(false, Ordering::SeqCst);
  }
}

/// Per-key refresh state for the whole cache.
pub struct RefreshScheduler {
  slots: DashMap<String, Arc<RefreshSlot>>,
}

impl RefreshScheduler {
  pub fn new() -> Self {
    Self {
      slots: DashMap::new(),
    }
  }

  fn slot(&self, user_key: &str) -> Arc<RefreshSlot> {
    self
      .slots
      .entry(user_key.to_string())
      .or_default()
      .clone()
  }

  /// Try to become the refresh for this key without waiting.
  ///
  /// Returns `None` when a refresh is already in flight; the caller must not
  /// start a second fetch in that case.
  pub fn try_begin(&self, user_key: &str) -> Option<RefreshTicket> {
    let slot = self.slot(user_key);
    let guard = Arc::clone(&slot.lock).try_lock_owned().ok()?;
    slot.refreshing.store(true, Ordering::SeqCst);
    Some(RefreshTicket { slot, _guard: guard })
  }

  /// Wait for the slot and become the refresh for this key.
  ///
  /// Used on the cold-start path, where the caller has nothing to serve and
  /// must block; callers queue here and re-check the store after acquiring.
  pub async fn begin(&self, user_key: &str) -> RefreshTicket {
    let slot = self.slot(user_key);
    let guard = Arc::clone(&slot.lock).lock_owned().await;
    slot.refreshing.store(true, Ordering::SeqCst);
    RefreshTicket { slot, _guard: guard }
  }

  pub fn is_refreshing(&self, user_key: &str) -> bool {
    self
      .slots
      .get(user_key)
      .map(|slot| slot.refreshing.load(Ordering::SeqCst))
      .unwrap_or(false)
  }

  pub fn last_error(&self, user_key: &str) -> Option<String> {
    self
      .slots
      .get(user_key)
      .and_then(|slot| slot.last_error.lock().clone())
  }
}

impl Default for RefreshScheduler {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_try_begin_is_single_flight() {
    let scheduler = RefreshScheduler::new();

    let ticket = scheduler.try_begin("42");
    assert!(ticket.is_some());
    assert!(scheduler.is_refreshing("42"));

    // A second trigger for the same key loses.
    assert!(scheduler.try_begin("42").is_none());

    // A different key is unaffected.
    assert!(scheduler.try_begin("43").is_some());
  }

  #[test]
  fn test_drop_releases_the_slot() {
    let scheduler = RefreshScheduler::new();

    let ticket = scheduler.try_begin("42").unwrap();
    drop(ticket);

    assert!(!scheduler.is_refreshing("42"));
    assert!(scheduler.try_begin("42").is_some());
  }

  #[test]
  fn test_failure_is_sticky_until_success() {
    let scheduler = RefreshScheduler::new();

    scheduler
      .try_begin("42")
      .unwrap()
      .fail("upstream rate limited".to_string());
    assert_eq!(
      scheduler.last_error("42").as_deref(),
      Some("upstream rate limited")
    );

    // Still reported after an unrelated drop.
    drop(scheduler.try_begin("42").unwrap());
    assert!(scheduler.last_error("42").is_some());

    scheduler.try_begin("42").unwrap().complete();
    assert!(scheduler.last_error("42").is_none());
  }

  #[tokio::test]
  async fn test_begin_waits_for_in_flight_refresh() {
    let scheduler = Arc::new(RefreshScheduler::new());

    let ticket = scheduler.begin("42").await;

    let waiting = {
      let scheduler = Arc::clone(&scheduler);
      tokio::spawn(async move {
        let ticket = scheduler.begin("42").await;
        ticket.complete();
      })
    };

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(!waiting.is_finished());

    ticket.complete();
    waiting.await.unwrap();
  }
}
