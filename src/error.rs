//! Errors that cross the dashboard service boundary.
//!
//! Everything else degrades in place: background refresh failures surface as
//! the `error` cache status on an otherwise successful response, and malformed
//! upstream records become a skipped-records diagnostic.

use crate::rocketlane::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
  /// No cached snapshot existed and the synchronous fetch failed, so there is
  /// nothing to serve.
  #[error("cold start failed: {0}")]
  ColdStart(UpstreamError),

  /// The request cannot be served until the configuration is fixed; retrying
  /// will not help.
  #[error("configuration error: {0}")]
  Configuration(String),
}

impl DashboardError {
  /// Stable code for programmatic handling. Authentication failures get their
  /// own code so the UI can send the user to settings instead of suggesting a
  /// retry.
  pub fn code(&self) -> &'static str {
    match self {
      Self::ColdStart(UpstreamError::Auth(_)) => "auth_error",
      Self::ColdStart(UpstreamError::RateLimited) => "upstream_rate_limited",
      Self::ColdStart(UpstreamError::Unavailable(_)) => "upstream_unavailable",
      Self::Configuration(_) => "configuration_error",
    }
  }
}
