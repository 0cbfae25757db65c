//! HTTP route layer over the dashboard service.
//!
//! One JSON endpoint polled by the web UI, plus a liveness probe. All caching
//! decisions live in the service; handlers only translate errors.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::net::SocketAddr;

use crate::config::Config;
use crate::dashboard::{Dashboard, DashboardService};
use crate::error::DashboardError;

#[derive(Clone)]
pub struct AppState {
  pub service: DashboardService,
  pub user_id: Option<String>,
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  /// Error code for programmatic handling.
  pub code: String,
  /// Human-readable error message.
  pub message: String,
}

impl DashboardError {
  fn status_code(&self) -> StatusCode {
    match self {
      // Configuration problems direct the user to settings, not to a retry.
      Self::Configuration(_) => StatusCode::FORBIDDEN,
      Self::ColdStart(_) => StatusCode::BAD_GATEWAY,
    }
  }
}

impl IntoResponse for DashboardError {
  fn into_response(self) -> Response {
    let status = self.status_code();
    let body = ErrorResponse {
      code: self.code().to_string(),
      message: self.to_string(),
    };
    (status, Json(body)).into_response()
  }
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
  Router::new()
    .route("/api/statistics", get(get_statistics))
    .route("/api/health", get(health_check))
    .with_state(state)
}

/// Statistics for the configured user, from cache whenever possible.
async fn get_statistics(
  State(state): State<AppState>,
) -> std::result::Result<Json<Dashboard>, DashboardError> {
  let user_id = state
    .user_id
    .as_deref()
    .filter(|id| !id.trim().is_empty())
    .ok_or_else(|| {
      DashboardError::Configuration(
        "no user selected; set rocketlane.user_id in the configuration".to_string(),
      )
    })?;

  let dashboard = state.service.get_dashboard(user_id).await?;
  Ok(Json(dashboard))
}

async fn health_check() -> Json<serde_json::Value> {
  Json(serde_json::json!({ "status": "ok" }))
}

/// Bind and run the service until shutdown.
pub async fn serve(config: Config, service: DashboardService) -> Result<()> {
  let user_id = config.rocketlane.user_id.clone();

  if config.server.warm_on_start {
    match user_id.clone() {
      Some(user_id) => {
        let service = service.clone();
        tokio::spawn(async move {
          service.warm(&user_id).await;
        });
      }
      None => tracing::warn!("warm_on_start set but no user id configured"),
    }
  }

  let addr: SocketAddr = config
    .server
    .listen
    .parse()
    .map_err(|e| eyre!("Invalid listen address {}: {}", config.server.listen, e))?;

  let state = AppState { service, user_id };
  let app = create_router(state);

  let listener = tokio::net::TcpListener::bind(addr)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", addr, e))?;
  tracing::info!(%addr, "listening");

  axum::serve(listener, app).await?;

  Ok(())
}
