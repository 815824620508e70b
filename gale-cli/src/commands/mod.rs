//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod item;
mod job;

pub use item::{RunnableCommands, VariableCommands};
pub use job::JobCommands;

use anyhow::Result;
use clap::Subcommand;
use gale_client::WindmillClient;
use std::sync::Arc;

use crate::config::Config;
use crate::store::JsonFileStore;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Script browsing and runs
    Script {
        #[command(subcommand)]
        command: RunnableCommands,
    },
    /// Flow browsing and runs
    Flow {
        #[command(subcommand)]
        command: RunnableCommands,
    },
    /// Variable browsing
    Variable {
        #[command(subcommand)]
        command: VariableCommands,
    },
    /// Job status, results and cancellation
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
}

/// Shared dependencies of the command handlers
pub struct Context {
    pub config: Config,
    pub client: Arc<WindmillClient>,
    pub store: Arc<JsonFileStore>,
}

impl Context {
    fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            client: Arc::new(WindmillClient::new(config.connection())),
            store: Arc::new(JsonFileStore::new(&config.state_file)),
        }
    }
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let ctx = Context::new(config);

    match command {
        Commands::Script { command } => {
            item::handle_runnable_command(item::RunnableKind::Script, command, &ctx).await
        }
        Commands::Flow { command } => {
            item::handle_runnable_command(item::RunnableKind::Flow, command, &ctx).await
        }
        Commands::Variable { command } => item::handle_variable_command(command, &ctx).await,
        Commands::Job { command } => job::handle_job_command(command, &ctx).await,
    }
}
