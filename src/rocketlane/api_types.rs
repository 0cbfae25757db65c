//! Serde-deserializable types matching Rocketlane API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs. The API is not
//! entirely consistent: list endpoints answer either a bare array or a wrapper
//! object, and some field names vary between endpoints (`minutes` vs
//! `durationInMinutes`, `date` vs `entryDate`). Everything here tolerates both.

use serde::Deserialize;

use super::types::{ProjectRecord, ProjectRef, TaskRecord, TimeEntryRecord, UserRecord};

// ============================================================================
// Common nested field types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiStatus {
  #[serde(default)]
  pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiPriority {
  #[serde(default)]
  pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiProjectRef {
  #[serde(rename = "projectId")]
  pub project_id: Option<u64>,
  #[serde(rename = "projectName", default)]
  pub project_name: String,
}

/// Page cursor shared by all list endpoints.
#[derive(Debug, Deserialize)]
pub struct ApiPagination {
  #[serde(rename = "hasMore", default)]
  pub has_more: bool,
  #[serde(rename = "nextPageToken")]
  pub next_page_token: Option<String>,
}

impl ApiPagination {
  /// Token for the next page, if the upstream says there is one.
  pub fn next_token(self) -> Option<String> {
    if self.has_more {
      self.next_page_token
    } else {
      None
    }
  }
}

// ============================================================================
// Tasks endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiTask {
  #[serde(rename = "taskId")]
  pub task_id: Option<u64>,
  #[serde(rename = "taskName", default)]
  pub task_name: String,
  pub status: Option<ApiStatus>,
  #[serde(rename = "dueDate")]
  pub due_date: Option<String>,
  #[serde(rename = "atRisk", default)]
  pub at_risk: bool,
  pub priority: Option<ApiPriority>,
  pub project: Option<ApiProjectRef>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiTasksResponse {
  Paged {
    #[serde(default)]
    tasks: Vec<ApiTask>,
    pagination: Option<ApiPagination>,
  },
  Bare(Vec<ApiTask>),
}

impl ApiTasksResponse {
  pub fn into_parts(self) -> (Vec<ApiTask>, Option<ApiPagination>) {
    match self {
      Self::Paged { tasks, pagination } => (tasks, pagination),
      Self::Bare(tasks) => (tasks, None),
    }
  }
}

// ============================================================================
// Projects endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiProject {
  #[serde(rename = "projectId")]
  pub project_id: Option<u64>,
  #[serde(rename = "projectName", default)]
  pub project_name: String,
  pub status: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiProjectsResponse {
  Paged {
    #[serde(default)]
    projects: Vec<ApiProject>,
    pagination: Option<ApiPagination>,
  },
  Bare(Vec<ApiProject>),
}

impl ApiProjectsResponse {
  pub fn into_parts(self) -> (Vec<ApiProject>, Option<ApiPagination>) {
    match self {
      Self::Paged {
        projects,
        pagination,
      } => (projects, pagination),
      Self::Bare(projects) => (projects, None),
    }
  }
}

// ============================================================================
// Time entries endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiTimeEntry {
  pub minutes: Option<u32>,
  #[serde(rename = "durationInMinutes")]
  pub duration_in_minutes: Option<u32>,
  pub date: Option<String>,
  #[serde(rename = "entryDate")]
  pub entry_date: Option<String>,
  pub project: Option<ApiProjectRef>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiTimeEntriesResponse {
  Paged {
    #[serde(rename = "timeEntries", default)]
    time_entries: Vec<ApiTimeEntry>,
    pagination: Option<ApiPagination>,
  },
  Bare(Vec<ApiTimeEntry>),
}

impl ApiTimeEntriesResponse {
  pub fn into_parts(self) -> (Vec<ApiTimeEntry>, Option<ApiPagination>) {
    match self {
      Self::Paged {
        time_entries,
        pagination,
      } => (time_entries, pagination),
      Self::Bare(entries) => (entries, None),
    }
  }
}

// ============================================================================
// Users endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  #[serde(rename = "userId")]
  pub user_id: Option<u64>,
  #[serde(rename = "firstName", default)]
  pub first_name: String,
  #[serde(rename = "lastName", default)]
  pub last_name: String,
  pub email: Option<String>,
  #[serde(rename = "emailId")]
  pub email_id: Option<String>,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiProjectRef> for ProjectRef {
  fn from(p: ApiProjectRef) -> Self {
    ProjectRef {
      project_id: p.project_id.map(|id| id.to_string()).unwrap_or_default(),
      name: p.project_name,
    }
  }
}

impl ApiTask {
  pub fn into_record(self) -> TaskRecord {
    TaskRecord {
      task_id: self.task_id.map(|id| id.to_string()).unwrap_or_default(),
      name: self.task_name,
      status: self.status.map(|s| s.label).unwrap_or_default(),
      due_date: self.due_date,
      at_risk: self.at_risk,
      priority: self.priority.map(|p| p.label),
      project: self.project.map(ProjectRef::from),
    }
  }
}

impl ApiProject {
  pub fn into_record(self) -> ProjectRecord {
    ProjectRecord {
      project_id: self.project_id.map(|id| id.to_string()).unwrap_or_default(),
      name: self.project_name,
      status: self.status.map(|s| s.label),
    }
  }
}

impl ApiTimeEntry {
  pub fn into_record(self) -> TimeEntryRecord {
    TimeEntryRecord {
      entry_date: self.date.or(self.entry_date),
      minutes: self.minutes.or(self.duration_in_minutes),
      project_id: self
        .project
        .and_then(|p| p.project_id)
        .map(|id| id.to_string()),
    }
  }
}

impl ApiUser {
  pub fn into_record(self) -> UserRecord {
    let full_name = format!("{} {}", self.first_name, self.last_name)
      .trim()
      .to_string();
    UserRecord {
      user_id: self.user_id.map(|id| id.to_string()).unwrap_or_default(),
      full_name: if full_name.is_empty() {
        "Unknown User".to_string()
      } else {
        full_name
      },
      email: self.email.or(self.email_id).unwrap_or_default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_tasks_response_accepts_wrapper_and_bare_array() {
    let wrapped = r#"{"tasks": [{"taskId": 1, "taskName": "Kickoff"}]}"#;
    let (tasks, _) = serde_json::from_str::<ApiTasksResponse>(wrapped)
      .unwrap()
      .into_parts();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task_name, "Kickoff");

    let bare = r#"[{"taskId": 2, "taskName": "Review"}]"#;
    let (tasks, pagination) = serde_json::from_str::<ApiTasksResponse>(bare)
      .unwrap()
      .into_parts();
    assert_eq!(tasks.len(), 1);
    assert!(pagination.is_none());
  }

  #[test]
  fn test_time_entry_duration_field_variants() {
    let entry: ApiTimeEntry =
      serde_json::from_str(r#"{"durationInMinutes": 90, "entryDate": "2024-03-04"}"#).unwrap();
    let record = entry.into_record();
    assert_eq!(record.minutes, Some(90));
    assert_eq!(record.entry_date.as_deref(), Some("2024-03-04"));

    let entry: ApiTimeEntry =
      serde_json::from_str(r#"{"minutes": 30, "date": "2024-03-05"}"#).unwrap();
    let record = entry.into_record();
    assert_eq!(record.minutes, Some(30));
    assert_eq!(record.entry_date.as_deref(), Some("2024-03-05"));
  }

  #[test]
  fn test_user_name_assembly() {
    let user: ApiUser =
      serde_json::from_str(r#"{"userId": 7, "firstName": "Ada", "lastName": "Lovelace"}"#).unwrap();
    let record = user.into_record();
    assert_eq!(record.full_name, "Ada Lovelace");

    let user: ApiUser = serde_json::from_str(r#"{"userId": 8}"#).unwrap();
    assert_eq!(user.into_record().full_name, "Unknown User");
  }

  #[test]
  fn test_pagination_next_token_requires_has_more() {
    let page: ApiPagination =
      serde_json::from_str(r#"{"hasMore": false, "nextPageToken": "abc"}"#).unwrap();
    assert!(page.next_token().is_none());

    let page: ApiPagination =
      serde_json::from_str(r#"{"hasMore": true, "nextPageToken": "abc"}"#).unwrap();
    assert_eq!(page.next_token().as_deref(), Some("abc"));
  }
}
