mod cache;
mod config;
mod dashboard;
mod error;
mod rocketlane;
mod server;
mod stats;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::dashboard::DashboardService;
use crate::rocketlane::{RocketlaneClient, Tracker};

#[derive(Parser, Debug)]
#[command(name = "worklens")]
#[command(about = "Cached statistics dashboard for Rocketlane work tracking")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/worklens/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run the HTTP service the dashboard UI polls
  Serve,
  /// Fetch the dashboard once and print it as JSON
  Dashboard {
    /// Rocketlane user id to compute for (default: configured user)
    #[arg(short, long)]
    user: Option<String>,
  },
}

/// Set up tracing. The serve command also logs to a daily-rolling file so
/// polling traffic can be inspected after the fact; the returned guard must
/// stay alive for the process lifetime.
fn init_tracing(log_to_file: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
  let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| "info,worklens=info".into());

  let log_dir = if log_to_file {
    dirs::data_dir().map(|dir| dir.join("worklens").join("logs"))
  } else {
    None
  };

  match log_dir {
    Some(dir) => {
      let appender = tracing_appender::rolling::daily(dir, "worklens.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
          tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false),
        )
        .init();
      Some(guard)
    }
    None => {
      tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
      None
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_tracing(matches!(args.command, Command::Serve));

  let config = config::Config::load(args.config.as_deref())?;

  let client = RocketlaneClient::new(&config)?;
  let tracker: Arc<dyn Tracker> = Arc::new(client);
  let service = DashboardService::new(tracker, config.ttl());

  match args.command {
    Command::Serve => server::serve(config, service).await,
    Command::Dashboard { user } => {
      let user_id = user
        .or_else(|| config.rocketlane.user_id.clone())
        .ok_or_else(|| eyre!("No user id: pass --user or set rocketlane.user_id"))?;

      let dashboard = service.get_dashboard(&user_id).await?;
      println!("{}", serde_json::to_string_pretty(&dashboard)?);
      Ok(())
    }
  }
}
