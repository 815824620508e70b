//! Configuration module
//!
//! Handles CLI configuration: the workspace connection, where local state
//! lives, and how often the job view polls.

use anyhow::{Context, Result};
use gale_core::domain::workspace::WorkspaceConnection;
use std::path::PathBuf;
use std::time::Duration;

/// Default interval between two job status fetches
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote service
    pub url: String,
    /// Workspace identifier
    pub workspace: String,
    /// Bearer token for the workspace
    pub token: String,
    /// JSON file holding local state (last execution times)
    pub state_file: PathBuf,
    /// How often the job view polls
    pub poll_interval: Duration,
}

impl Config {
    /// Connection descriptor for the configured workspace
    pub fn connection(&self) -> WorkspaceConnection {
        WorkspaceConnection::new(&self.url, &self.workspace, &self.token)
    }

    /// Default location of the state file: `~/.gale/state.json`
    pub fn default_state_file() -> Result<PathBuf> {
        let home = home::home_dir().context("Home directory not found")?;
        Ok(home.join(".gale").join("state.json"))
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            anyhow::bail!("url must start with http:// or https://");
        }

        if self.workspace.is_empty() {
            anyhow::bail!("workspace cannot be empty");
        }

        if self.token.is_empty() {
            anyhow::bail!("token cannot be empty");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll interval must be greater than 0");
        }

        Ok(())
    }
}
