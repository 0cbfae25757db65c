use async_trait::async_trait;
use chrono::NaiveDate;
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;

use super::api_types::{
  ApiProjectsResponse, ApiTasksResponse, ApiTimeEntriesResponse, ApiUser,
};
use super::types::{ProjectRecord, TaskRecord, TimeEntryRecord, UserRecord};
use super::{Tracker, UpstreamError};

/// Page size for list endpoints. The API caps pages; several round-trips per
/// refresh are expected for busy users.
const PAGE_SIZE: u32 = 100;

/// Rocketlane API client wrapper
#[derive(Clone)]
pub struct RocketlaneClient {
  http: reqwest::Client,
  base_url: Url,
  api_key: String,
}

impl RocketlaneClient {
  pub fn new(config: &Config) -> Result<Self> {
    let api_key = Config::get_api_key()?;

    let base_url = Url::parse(&config.rocketlane.base_url)
      .map_err(|e| eyre!("Invalid Rocketlane base URL {}: {}", config.rocketlane.base_url, e))?;

    let http = reqwest::Client::builder()
      .timeout(config.request_timeout())
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      api_key,
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
    self
      .base_url
      .join(path)
      .map_err(|e| UpstreamError::Unavailable(format!("invalid endpoint {}: {}", path, e)))
  }

  async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T, UpstreamError> {
    let url = self.endpoint(path)?;

    let response = self
      .http
      .get(url)
      .header("api-key", &self.api_key)
      .header("accept", "application/json")
      .query(query)
      .send()
      .await
      .map_err(transport_error)?;

    match response.status() {
      status if status.is_success() => response
        .json()
        .await
        .map_err(|e| UpstreamError::Unavailable(format!("malformed response: {}", e))),
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(UpstreamError::Auth(format!(
        "{} answered {}",
        path,
        response.status()
      ))),
      StatusCode::TOO_MANY_REQUESTS => Err(UpstreamError::RateLimited),
      status => Err(UpstreamError::Unavailable(format!(
        "{} answered {}",
        path, status
      ))),
    }
  }
}

fn transport_error(e: reqwest::Error) -> UpstreamError {
  if e.is_timeout() {
    UpstreamError::Unavailable("request timed out".to_string())
  } else {
    UpstreamError::Unavailable(e.to_string())
  }
}

#[async_trait]
impl Tracker for RocketlaneClient {
  async fn fetch_user(&self, user_id: &str) -> Result<UserRecord, UpstreamError> {
    let user: ApiUser = self.get_json(&format!("users/{}", user_id), &[]).await?;
    Ok(user.into_record())
  }

  async fn fetch_tasks(&self, user_id: &str) -> Result<Vec<TaskRecord>, UpstreamError> {
    let mut all_tasks = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
      let mut query = vec![
        ("pageSize", PAGE_SIZE.to_string()),
        ("filters", format!("assignees.cn={}", user_id)),
      ];
      if let Some(token) = &page_token {
        query.push(("pageToken", token.clone()));
      }

      let response: ApiTasksResponse = self.get_json("tasks", &query).await?;
      let (tasks, pagination) = response.into_parts();

      all_tasks.extend(tasks.into_iter().map(|t| t.into_record()));

      match pagination.and_then(|p| p.next_token()) {
        Some(token) => page_token = Some(token),
        None => break,
      }
    }

    Ok(all_tasks)
  }

  async fn fetch_projects(&self) -> Result<Vec<ProjectRecord>, UpstreamError> {
    let mut all_projects = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
      let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
      if let Some(token) = &page_token {
        query.push(("pageToken", token.clone()));
      }

      let response: ApiProjectsResponse = self.get_json("projects", &query).await?;
      let (projects, pagination) = response.into_parts();

      all_projects.extend(projects.into_iter().map(|p| p.into_record()));

      match pagination.and_then(|p| p.next_token()) {
        Some(token) => page_token = Some(token),
        None => break,
      }
    }

    Ok(all_projects)
  }

  async fn fetch_time_entries(
    &self,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<TimeEntryRecord>, UpstreamError> {
    let mut all_entries = Vec::new();
    let mut page_token: Option<String> = None;

    let filters = format!(
      "user.eq={},date.ge={},date.le={}",
      user_id,
      from.format("%Y-%m-%d"),
      to.format("%Y-%m-%d")
    );

    loop {
      let mut query = vec![
        ("pageSize", PAGE_SIZE.to_string()),
        ("filters", filters.clone()),
      ];
      if let Some(token) = &page_token {
        query.push(("pageToken", token.clone()));
      }

      let response: ApiTimeEntriesResponse = self.get_json("time-entries/search", &query).await?;
      let (entries, pagination) = response.into_parts();

      all_entries.extend(entries.into_iter().map(|e| e.into_record()));

      match pagination.and_then(|p| p.next_token()) {
        Some(token) => page_token = Some(token),
        None => break,
      }
    }

    Ok(all_entries)
  }
}
