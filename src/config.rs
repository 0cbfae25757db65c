use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub rocketlane: RocketlaneConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RocketlaneConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Identity the dashboard is computed for. Without it the service starts,
  /// but statistics requests answer with a configuration error.
  pub user_id: Option<String>,
  #[serde(default = "default_request_timeout")]
  pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Age past which a snapshot is reclassified as stale. Upstream data
  /// changes slowly but not instantly; five minutes is a good default.
  #[serde(default = "default_ttl")]
  pub ttl_seconds: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_seconds: default_ttl(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_listen")]
  pub listen: String,
  /// Pre-populate the cache on startup so the first poll is served warm.
  #[serde(default)]
  pub warm_on_start: bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      listen: default_listen(),
      warm_on_start: false,
    }
  }
}

fn default_base_url() -> String {
  "https://api.rocketlane.com/api/1.0/".to_string()
}

fn default_request_timeout() -> u64 {
  30
}

fn default_ttl() -> u64 {
  300
}

fn default_listen() -> String {
  "127.0.0.1:8600".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./worklens.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/worklens/config.yaml
  /// 4. ~/.config/worklens/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/worklens/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("worklens.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("worklens").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the Rocketlane API key from environment variables.
  ///
  /// Checks WORKLENS_API_KEY first, then ROCKETLANE_API_KEY as fallback.
  pub fn get_api_key() -> Result<String> {
    std::env::var("WORKLENS_API_KEY")
      .or_else(|_| std::env::var("ROCKETLANE_API_KEY"))
      .map_err(|_| {
        eyre!(
          "Rocketlane API key not found. Set WORKLENS_API_KEY or ROCKETLANE_API_KEY environment variable."
        )
      })
  }

  pub fn ttl(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.cache.ttl_seconds as i64)
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.rocketlane.request_timeout_seconds)
  }
}
