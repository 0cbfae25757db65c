//! Dashboard service: the composition root the route layer calls.
//!
//! Wires the upstream tracker, the statistics computer, the snapshot store and
//! the refresh scheduler into a single entry point. The latency contract is
//! that only the very first request for a user (no cache yet) waits on the
//! network; every later request is an O(1) cache read, with staleness reported
//! through the `cache_status` field instead of added latency.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{classify_staleness, Freshness, RefreshScheduler, RefreshTicket, SnapshotStore};
use crate::error::DashboardError;
use crate::rocketlane::{Tracker, UpstreamError, UserRecord};
use crate::stats::{compute_snapshot, StatCounts, StatSnapshot, TaskBuckets};

/// Cache state reported with every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
  /// Snapshot younger than the TTL.
  Fresh,
  /// Snapshot past the TTL; a background refresh has been triggered.
  Stale,
  /// A refresh is in flight; the data shown predates it.
  Updating,
  /// The last refresh failed; the previous good snapshot is shown until one
  /// succeeds.
  Error,
}

/// Response shape served to the route layer; the UI polls it every 30 seconds.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
  pub user: UserRecord,
  pub statistics: StatCounts,
  pub tasks: TaskBuckets,
  pub cache_status: CacheStatus,
  pub last_updated: DateTime<Utc>,
  pub skipped_records: u32,
}

struct Inner {
  tracker: Arc<dyn Tracker>,
  store: SnapshotStore,
  scheduler: RefreshScheduler,
  ttl: Duration,
}

/// The single entry point consumed by the route layer.
#[derive(Clone)]
pub struct DashboardService {
  inner: Arc<Inner>,
}

impl DashboardService {
  pub fn new(tracker: Arc<dyn Tracker>, ttl: Duration) -> Self {
    Self {
      inner: Arc::new(Inner {
        tracker,
        store: SnapshotStore::new(),
        scheduler: RefreshScheduler::new(),
        ttl,
      }),
    }
  }

  /// Serve the dashboard for one user.
  ///
  /// Cache hit: returns immediately, kicking off at most one background
  /// refresh when the snapshot is stale or the last refresh failed. Cache
  /// miss: blocks on the upstream round-trip and returns a fresh snapshot or
  /// a cold-start error.
  pub async fn get_dashboard(&self, user_id: &str) -> Result<Dashboard, DashboardError> {
    let user_id = require_user_id(user_id)?;

    let now = Utc::now();
    if let Some(snapshot) = self.inner.store.get(user_id) {
      return Ok(self.serve_cached(user_id, &snapshot, now));
    }

    self.cold_start(user_id).await
  }

  /// Force a synchronous recomputation, regardless of freshness.
  ///
  /// On failure with a previous good snapshot this degrades to an `error`
  /// response rather than failing the caller; without one it behaves like a
  /// failed cold start.
  pub async fn refresh_now(&self, user_id: &str) -> Result<Dashboard, DashboardError> {
    let user_id = require_user_id(user_id)?;

    let ticket = self.inner.scheduler.begin(user_id).await;
    match self.run_refresh(user_id).await {
      Ok(snapshot) => {
        ticket.complete();
        Ok(build_dashboard(&snapshot, CacheStatus::Fresh))
      }
      Err(err) => match self.inner.store.get(user_id) {
        Some(snapshot) => {
          tracing::warn!(user_id = %user_id, error = %err, "forced refresh failed, serving previous snapshot");
          ticket.fail(err.to_string());
          Ok(build_dashboard(&snapshot, CacheStatus::Error))
        }
        None => {
          drop(ticket);
          Err(DashboardError::ColdStart(err))
        }
      },
    }
  }

  /// Pre-populate the cache so the first poll doesn't pay the cold start.
  /// Failures are logged, never fatal.
  pub async fn warm(&self, user_id: &str) {
    match self.refresh_now(user_id).await {
      Ok(_) => tracing::info!(user_id = %user_id, "cache warmed"),
      Err(err) => tracing::warn!(user_id = %user_id, error = %err, "cache warm failed"),
    }
  }

  fn serve_cached(
    &self,
    user_id: &str,
    snapshot: &Arc<StatSnapshot>,
    now: DateTime<Utc>,
  ) -> Dashboard {
    let inner = &self.inner;
    let freshness = classify_staleness(snapshot, now, inner.ttl);
    let failed = inner.scheduler.last_error(user_id).is_some();

    let cache_status = if failed {
      CacheStatus::Error
    } else if inner.scheduler.is_refreshing(user_id) {
      CacheStatus::Updating
    } else if freshness == Freshness::Stale {
      CacheStatus::Stale
    } else {
      CacheStatus::Fresh
    };

    // Stale data and sticky failures both retry here; try_begin makes the
    // losers of a concurrent race no-ops.
    if failed || freshness == Freshness::Stale {
      if let Some(ticket) = inner.scheduler.try_begin(user_id) {
        self.spawn_refresh(user_id.to_string(), ticket);
      }
    }

    build_dashboard(snapshot, cache_status)
  }

  async fn cold_start(&self, user_id: &str) -> Result<Dashboard, DashboardError> {
    let ticket = self.inner.scheduler.begin(user_id).await;

    // Another caller may have populated the store while we queued.
    if let Some(snapshot) = self.inner.store.get(user_id) {
      ticket.complete();
      return Ok(build_dashboard(&snapshot, CacheStatus::Fresh));
    }

    match self.run_refresh(user_id).await {
      Ok(snapshot) => {
        ticket.complete();
        Ok(build_dashboard(&snapshot, CacheStatus::Fresh))
      }
      Err(err) => {
        tracing::error!(user_id = %user_id, error = %err, "cold start fetch failed");
        drop(ticket);
        Err(DashboardError::ColdStart(err))
      }
    }
  }

  /// Detached refresh whose result is only ever consumed through the store
  /// write; the triggering request never awaits it.
  fn spawn_refresh(&self, user_id: String, ticket: RefreshTicket) {
    let service = self.clone();
    tokio::spawn(async move {
      match service.run_refresh(&user_id).await {
        Ok(_) => {
          tracing::debug!(user_id = %user_id, "background refresh completed");
          ticket.complete();
        }
        Err(err) => {
          tracing::warn!(user_id = %user_id, error = %err, "background refresh failed");
          ticket.fail(err.to_string());
        }
      }
    });
  }

  async fn run_refresh(&self, user_id: &str) -> Result<Arc<StatSnapshot>, UpstreamError> {
    let inner = &self.inner;

    let user = inner.tracker.fetch_user(user_id).await?;
    let tasks = inner.tracker.fetch_tasks(user_id).await?;
    let projects = inner.tracker.fetch_projects().await?;

    let today = Utc::now().date_naive();
    let week_start = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
    let time_entries = inner
      .tracker
      .fetch_time_entries(user_id, week_start, today)
      .await?;

    let snapshot = Arc::new(compute_snapshot(
      user,
      &tasks,
      &projects,
      &time_entries,
      Utc::now(),
    ));

    if snapshot.skipped_records > 0 {
      tracing::warn!(
        user_id = %user_id,
        skipped = snapshot.skipped_records,
        "skipped malformed upstream records"
      );
    }

    if inner.store.put(user_id, Arc::clone(&snapshot)) {
      tracing::info!(
        user_id = %user_id,
        total_tasks = snapshot.counts.total_tasks,
        "statistics recomputed"
      );
    } else {
      tracing::warn!(user_id = %user_id, "discarded snapshot older than the cached one");
    }

    Ok(snapshot)
  }
}

fn require_user_id(user_id: &str) -> Result<&str, DashboardError> {
  let trimmed = user_id.trim();
  if trimmed.is_empty() {
    return Err(DashboardError::Configuration(
      "no user id configured".to_string(),
    ));
  }
  Ok(trimmed)
}

fn build_dashboard(snapshot: &StatSnapshot, cache_status: CacheStatus) -> Dashboard {
  Dashboard {
    user: snapshot.user.clone(),
    statistics: snapshot.counts.clone(),
    tasks: snapshot.buckets.clone(),
    cache_status,
    last_updated: snapshot.computed_at,
    skipped_records: snapshot.skipped_records,
  }
}
