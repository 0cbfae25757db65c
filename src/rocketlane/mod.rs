//! Client for the Rocketlane work-tracking API.

pub mod api_types;
pub mod client;
pub mod types;

pub use client::RocketlaneClient;
pub use types::{ProjectRecord, ProjectRef, TaskRecord, TimeEntryRecord, UserRecord};

use async_trait::async_trait;
use chrono::NaiveDate;

/// Errors surfaced by the upstream work-tracking API.
///
/// The refresh scheduler treats all three variants as "refresh failed"; only
/// the dashboard service distinguishes `Auth` on the cold-start path, where it
/// maps to a configuration problem rather than a transient one.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
  #[error("upstream unavailable: {0}")]
  Unavailable(String),

  #[error("upstream rate limited")]
  RateLimited,

  #[error("upstream authentication failed: {0}")]
  Auth(String),
}

impl UpstreamError {
  pub fn is_auth(&self) -> bool {
    matches!(self, Self::Auth(_))
  }
}

/// Interface to the upstream work tracker.
///
/// All data is fetched already filtered to the target user's assignment where
/// the upstream supports it. Implementations must bound every call with a
/// timeout; the callers never add one of their own.
#[async_trait]
pub trait Tracker: Send + Sync {
  /// Look up the user the dashboard is computed for.
  async fn fetch_user(&self, user_id: &str) -> Result<UserRecord, UpstreamError>;

  /// All tasks assigned to the user, across projects.
  async fn fetch_tasks(&self, user_id: &str) -> Result<Vec<TaskRecord>, UpstreamError>;

  /// All projects visible in the workspace.
  async fn fetch_projects(&self) -> Result<Vec<ProjectRecord>, UpstreamError>;

  /// Time entries logged by the user within `[from, to]` inclusive.
  async fn fetch_time_entries(
    &self,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<TimeEntryRecord>, UpstreamError>;
}
