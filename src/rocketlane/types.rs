use serde::{Deserialize, Serialize};

/// A user as known to the work tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
  pub user_id: String,
  pub full_name: String,
  pub email: String,
}

/// Reference to the project a task belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
  pub project_id: String,
  pub name: String,
}

/// A task assigned to the user.
///
/// Status and dates are kept as upstream reports them (a display label and a
/// `YYYY-MM-DD` string); classification happens in the statistics computer so
/// that a single malformed field never fails a whole fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
  /// Empty when the upstream record carried no id; such records are skipped
  /// during aggregation and counted as malformed.
  pub task_id: String,
  pub name: String,
  pub status: String,
  pub due_date: Option<String>,
  pub at_risk: bool,
  pub priority: Option<String>,
  pub project: Option<ProjectRef>,
}

impl TaskRecord {
  pub fn is_completed(&self) -> bool {
    matches!(
      self.status.to_lowercase().as_str(),
      "completed" | "done" | "closed"
    )
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self.status.to_lowercase().as_str(), "cancelled" | "canceled")
  }
}

/// Project summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
  pub project_id: String,
  pub name: String,
  pub status: Option<String>,
}

/// One logged time entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntryRecord {
  /// Entry date as `YYYY-MM-DD`; absent on malformed records.
  pub entry_date: Option<String>,
  /// Logged duration; the upstream stores minutes.
  pub minutes: Option<u32>,
  pub project_id: Option<String>,
}
