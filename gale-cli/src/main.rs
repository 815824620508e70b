//! Gale CLI
//!
//! Command-line client for a Windmill-style orchestration service: browse
//! scripts, flows and variables, trigger runs, and follow a job until it
//! completes.

mod commands;
mod config;
mod store;
mod watch;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::{Config, DEFAULT_POLL_INTERVAL};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gale")]
#[command(about = "Browse and run Windmill scripts and flows", long_about = None)]
struct Cli {
    /// Base URL of the service
    #[arg(long, env = "WINDMILL_URL", default_value = "http://localhost:8000")]
    url: String,

    /// Workspace identifier
    #[arg(long, env = "WINDMILL_WORKSPACE", default_value = "demo")]
    workspace: String,

    /// Workspace token
    #[arg(long, env = "WINDMILL_TOKEN", hide_env_values = true)]
    token: String,

    /// File holding local state (defaults to ~/.gale/state.json)
    #[arg(long, env = "GALE_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Interval between job status fetches, in milliseconds
    #[arg(
        long,
        env = "GALE_POLL_INTERVAL_MS",
        default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64
    )]
    poll_interval_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so rendered output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gale=warn,gale_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let state_file = match cli.state_file {
        Some(path) => path,
        None => Config::default_state_file()?,
    };

    let config = Config {
        url: cli.url,
        workspace: cli.workspace,
        token: cli.token,
        state_file,
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
    };
    config.validate()?;

    handle_command(cli.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_interval_defaults_to_config() {
        let cli = Cli::try_parse_from(["gale", "--token", "t", "variable", "list"]).unwrap();
        assert_eq!(Duration::from_millis(cli.poll_interval_ms), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_poll_interval_flag() {
        let cli = Cli::try_parse_from([
            "gale",
            "--token",
            "t",
            "--poll-interval-ms",
            "250",
            "variable",
            "list",
        ])
        .unwrap();
        assert_eq!(cli.poll_interval_ms, 250);
    }
}
