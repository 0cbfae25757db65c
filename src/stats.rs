//! Pure statistics aggregation over one user's tasks and time entries.
//!
//! `compute_snapshot` is a total function: no I/O, no global clock (the
//! invocation time is a parameter), and malformed upstream records are skipped
//! and counted rather than failing the whole aggregation.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::rocketlane::{ProjectRecord, ProjectRef, TaskRecord, TimeEntryRecord, UserRecord};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Aggregate counts shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatCounts {
  pub total_tasks: u32,
  pub active_tasks: u32,
  pub completed_tasks: u32,
  pub overdue_tasks: u32,
  pub at_risk_tasks: u32,
  pub due_this_week: u32,
  pub projects_count: u32,
  pub hours_logged_this_week: f64,
}

/// A task as listed inside a dashboard bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRef {
  pub task_id: String,
  pub name: String,
  pub project: Option<ProjectRef>,
  pub due_date: Option<String>,
  pub status: String,
  pub priority: Option<String>,
}

/// Categorized task lists, each in upstream order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskBuckets {
  pub active: Vec<TaskRef>,
  pub at_risk: Vec<TaskRef>,
  pub due_this_week: Vec<TaskRef>,
  pub overdue: Vec<TaskRef>,
}

/// One fully computed statistics result for one user at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
  pub user: UserRecord,
  pub counts: StatCounts,
  pub buckets: TaskBuckets,
  pub computed_at: DateTime<Utc>,
  /// Malformed upstream records dropped or left unclassified during this
  /// computation.
  pub skipped_records: u32,
}

/// Upstream risk enrichment for the at-risk classification.
///
/// Kept separate so the policy can change without touching the aggregation:
/// overdue tasks are always at risk, this only adds to that baseline. When the
/// upstream stops providing the flag, returning `false` here degrades at-risk
/// to overdue-only.
fn risk_policy(task: &TaskRecord) -> bool {
  task.at_risk
}

/// Derive counts and buckets from one user's records.
///
/// Date classification is relative to `now`: overdue means due before the
/// start of the current day, due-this-week means due within the next seven
/// days inclusive, and hours are summed over the current Monday-based week.
pub fn compute_snapshot(
  user: UserRecord,
  tasks: &[TaskRecord],
  projects: &[ProjectRecord],
  time_entries: &[TimeEntryRecord],
  now: DateTime<Utc>,
) -> StatSnapshot {
  let today = now.date_naive();
  let week_end = today + Days::new(7);
  let week_start = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
  let week_last_day = week_start + Days::new(6);

  let project_names: HashMap<&str, &str> = projects
    .iter()
    .filter(|p| !p.project_id.is_empty())
    .map(|p| (p.project_id.as_str(), p.name.as_str()))
    .collect();

  let mut counts = StatCounts::default();
  let mut buckets = TaskBuckets::default();
  let mut skipped: u32 = 0;
  let mut active_projects: BTreeSet<&str> = BTreeSet::new();

  for task in tasks {
    if task.task_id.is_empty() {
      skipped += 1;
      continue;
    }
    counts.total_tasks += 1;

    if task.is_completed() {
      counts.completed_tasks += 1;
      continue;
    }

    if !task.is_cancelled() {
      counts.active_tasks += 1;
      if let Some(project) = &task.project {
        if !project.project_id.is_empty() {
          active_projects.insert(project.project_id.as_str());
        }
      }
      buckets.active.push(task_ref(task, &project_names));
    }

    let mut overdue = false;
    if let Some(raw) = task.due_date.as_deref() {
      match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(due) => {
          if due < today {
            overdue = true;
            counts.overdue_tasks += 1;
            buckets.overdue.push(task_ref(task, &project_names));
          } else if due <= week_end {
            counts.due_this_week += 1;
            buckets.due_this_week.push(task_ref(task, &project_names));
          }
        }
        // An unparseable due date leaves the task in the totals but out of
        // the date buckets.
        Err(_) => skipped += 1,
      }
    }

    if overdue || risk_policy(task) {
      counts.at_risk_tasks += 1;
      buckets.at_risk.push(task_ref(task, &project_names));
    }
  }

  counts.projects_count = active_projects.len() as u32;

  let mut minutes_this_week: u64 = 0;
  for entry in time_entries {
    let (Some(raw_date), Some(minutes)) = (entry.entry_date.as_deref(), entry.minutes) else {
      skipped += 1;
      continue;
    };
    match NaiveDate::parse_from_str(raw_date, DATE_FORMAT) {
      Ok(date) if date >= week_start && date <= week_last_day => {
        minutes_this_week += u64::from(minutes);
      }
      Ok(_) => {}
      Err(_) => skipped += 1,
    }
  }
  counts.hours_logged_this_week = round_hours(minutes_this_week);

  StatSnapshot {
    user,
    counts,
    buckets,
    computed_at: now,
    skipped_records: skipped,
  }
}

/// Minutes to hours, rounded to one decimal.
fn round_hours(minutes: u64) -> f64 {
  (minutes as f64 / 60.0 * 10.0).round() / 10.0
}

fn task_ref(task: &TaskRecord, project_names: &HashMap<&str, &str>) -> TaskRef {
  let project = task.project.clone().map(|mut p| {
    if p.name.is_empty() {
      if let Some(name) = project_names.get(p.project_id.as_str()) {
        p.name = (*name).to_string();
      }
    }
    p
  });

  TaskRef {
    task_id: task.task_id.clone(),
    name: task.name.clone(),
    project,
    due_date: task.due_date.clone(),
    status: task.status.clone(),
    priority: task.priority.clone(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  // Wednesday; the current week runs 2024-03-04 (Monday) through 2024-03-10.
  fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap()
  }

  fn test_user() -> UserRecord {
    UserRecord {
      user_id: "42".to_string(),
      full_name: "Ada Lovelace".to_string(),
      email: "ada@example.com".to_string(),
    }
  }

  fn task(id: &str, status: &str, due_date: Option<&str>) -> TaskRecord {
    TaskRecord {
      task_id: id.to_string(),
      name: format!("Task {}", id),
      status: status.to_string(),
      due_date: due_date.map(String::from),
      at_risk: false,
      priority: None,
      project: None,
    }
  }

  fn task_in_project(id: &str, status: &str, project_id: &str) -> TaskRecord {
    TaskRecord {
      project: Some(ProjectRef {
        project_id: project_id.to_string(),
        name: String::new(),
      }),
      ..task(id, status, None)
    }
  }

  fn entry(date: &str, minutes: u32) -> TimeEntryRecord {
    TimeEntryRecord {
      entry_date: Some(date.to_string()),
      minutes: Some(minutes),
      project_id: None,
    }
  }

  #[test]
  fn test_counts_scenario() {
    // 10 tasks: 3 overdue, 2 due within the next 7 days, 5 completed.
    let tasks = vec![
      task("1", "In Progress", Some("2024-03-01")),
      task("2", "In Progress", Some("2024-03-05")),
      task("3", "To Do", Some("2024-02-20")),
      task("4", "To Do", Some("2024-03-08")),
      task("5", "In Progress", Some("2024-03-10")),
      task("6", "Completed", None),
      task("7", "Done", None),
      task("8", "Closed", Some("2024-03-01")),
      task("9", "Completed", None),
      task("10", "Completed", None),
    ];

    let snapshot = compute_snapshot(test_user(), &tasks, &[], &[], test_now());

    assert_eq!(snapshot.counts.total_tasks, 10);
    assert_eq!(snapshot.counts.active_tasks, 5);
    assert_eq!(snapshot.counts.completed_tasks, 5);
    assert_eq!(snapshot.counts.overdue_tasks, 3);
    assert_eq!(snapshot.counts.due_this_week, 2);
    assert_eq!(snapshot.skipped_records, 0);
  }

  #[test]
  fn test_overdue_count_matches_bucket() {
    let tasks = vec![
      task("1", "In Progress", Some("2024-03-01")),
      task("2", "To Do", Some("2024-02-01")),
      task("3", "To Do", Some("2024-03-09")),
    ];

    let snapshot = compute_snapshot(test_user(), &tasks, &[], &[], test_now());

    assert_eq!(
      snapshot.counts.overdue_tasks as usize,
      snapshot.buckets.overdue.len()
    );
    let ids: Vec<&str> = snapshot
      .buckets
      .overdue
      .iter()
      .map(|t| t.task_id.as_str())
      .collect();
    assert_eq!(ids, vec!["1", "2"]);
  }

  #[test]
  fn test_hours_logged_this_week() {
    let entries = vec![
      entry("2024-03-04", 90),
      entry("2024-03-05", 30),
      // Outside the current week in both directions.
      entry("2024-02-28", 480),
      entry("2024-03-11", 60),
    ];

    let snapshot = compute_snapshot(test_user(), &[], &[], &entries, test_now());

    assert_eq!(snapshot.counts.hours_logged_this_week, 2.0);
  }

  #[test]
  fn test_hours_rounded_to_one_decimal() {
    // 100 minutes = 1.666… hours
    let entries = vec![entry("2024-03-06", 100)];
    let snapshot = compute_snapshot(test_user(), &[], &[], &entries, test_now());
    assert_eq!(snapshot.counts.hours_logged_this_week, 1.7);
  }

  #[test]
  fn test_due_window_boundaries_inclusive() {
    let tasks = vec![
      task("today", "To Do", Some("2024-03-06")),
      task("last-day", "To Do", Some("2024-03-13")),
      task("past-window", "To Do", Some("2024-03-14")),
      task("yesterday", "To Do", Some("2024-03-05")),
    ];

    let snapshot = compute_snapshot(test_user(), &tasks, &[], &[], test_now());

    let due: Vec<&str> = snapshot
      .buckets
      .due_this_week
      .iter()
      .map(|t| t.task_id.as_str())
      .collect();
    assert_eq!(due, vec!["today", "last-day"]);
    assert_eq!(snapshot.counts.overdue_tasks, 1);
  }

  #[test]
  fn test_at_risk_is_overdue_or_flagged() {
    let mut flagged = task("flagged", "In Progress", Some("2024-03-20"));
    flagged.at_risk = true;
    let mut flagged_done = task("flagged-done", "Completed", None);
    flagged_done.at_risk = true;

    let tasks = vec![
      flagged,
      flagged_done,
      task("overdue", "To Do", Some("2024-03-01")),
      task("calm", "To Do", Some("2024-03-20")),
    ];

    let snapshot = compute_snapshot(test_user(), &tasks, &[], &[], test_now());

    let at_risk: Vec<&str> = snapshot
      .buckets
      .at_risk
      .iter()
      .map(|t| t.task_id.as_str())
      .collect();
    assert_eq!(at_risk, vec!["flagged", "overdue"]);
    assert_eq!(snapshot.counts.at_risk_tasks, 2);
  }

  #[test]
  fn test_cancelled_tasks_are_not_active() {
    let tasks = vec![
      task("1", "Cancelled", None),
      task("2", "In Progress", None),
      task("3", "Canceled", None),
    ];

    let snapshot = compute_snapshot(test_user(), &tasks, &[], &[], test_now());

    assert_eq!(snapshot.counts.total_tasks, 3);
    assert_eq!(snapshot.counts.active_tasks, 1);
    assert_eq!(snapshot.buckets.active.len(), 1);
  }

  #[test]
  fn test_projects_count_distinct_active_projects() {
    let tasks = vec![
      task_in_project("1", "In Progress", "100"),
      task_in_project("2", "To Do", "100"),
      task_in_project("3", "In Progress", "200"),
      // Completed tasks don't contribute their project.
      task_in_project("4", "Completed", "300"),
    ];
    let projects = vec![
      ProjectRecord {
        project_id: "100".to_string(),
        name: "Rollout".to_string(),
        status: None,
      },
      ProjectRecord {
        project_id: "200".to_string(),
        name: "Onboarding".to_string(),
        status: None,
      },
    ];

    let snapshot = compute_snapshot(test_user(), &tasks, &projects, &[], test_now());

    assert_eq!(snapshot.counts.projects_count, 2);
    // Project names are resolved from the workspace project list.
    let first = &snapshot.buckets.active[0];
    assert_eq!(first.project.as_ref().map(|p| p.name.as_str()), Some("Rollout"));
  }

  #[test]
  fn test_malformed_records_are_skipped_not_fatal() {
    let mut missing_id = task("", "In Progress", None);
    missing_id.name = "ghost".to_string();
    let bad_due = task("1", "To Do", Some("next tuesday"));

    let entries = vec![
      TimeEntryRecord {
        entry_date: None,
        minutes: Some(60),
        project_id: None,
      },
      TimeEntryRecord {
        entry_date: Some("2024-03-05".to_string()),
        minutes: None,
        project_id: None,
      },
      entry("not-a-date", 60),
      entry("2024-03-05", 60),
    ];

    let snapshot = compute_snapshot(test_user(), &[missing_id, bad_due], &[], &entries, test_now());

    // Task with no id is dropped; the bad due date keeps its task in totals.
    assert_eq!(snapshot.counts.total_tasks, 1);
    assert_eq!(snapshot.counts.active_tasks, 1);
    assert_eq!(snapshot.counts.overdue_tasks, 0);
    assert_eq!(snapshot.counts.hours_logged_this_week, 1.0);
    assert_eq!(snapshot.skipped_records, 5);
  }

  #[test]
  fn test_deterministic_for_identical_input() {
    let tasks = vec![
      task("1", "In Progress", Some("2024-03-01")),
      task_in_project("2", "To Do", "100"),
      task("3", "Completed", None),
    ];
    let entries = vec![entry("2024-03-04", 45)];

    let a = compute_snapshot(test_user(), &tasks, &[], &entries, test_now());
    let b = compute_snapshot(test_user(), &tasks, &[], &entries, test_now());

    assert_eq!(a, b);
  }
}
