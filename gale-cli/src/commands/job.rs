//! Job command handlers
//!
//! Handles all job-related CLI commands: one-shot status, the live job
//! view, cancellation, results and logs.

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Subcommand;
use colored::*;
use uuid::Uuid;

use super::Context;
use crate::watch::state::PollState;
use crate::watch::{ViewOptions, run_job_view};

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Show the current status of a job
    Get {
        /// Job ID
        id: String,
    },
    /// Follow a job until it completes
    Watch {
        /// Job ID
        id: String,

        /// Script or flow path the job belongs to
        #[arg(long)]
        path: Option<String>,

        /// Print the full result once the job succeeded
        #[arg(long)]
        print_result: bool,
    },
    /// Cancel a queued or running job
    Cancel {
        /// Job ID
        id: String,
    },
    /// Print the full result of a completed job
    Result {
        /// Job ID
        id: String,
    },
    /// Print the logs of a job
    Logs {
        /// Job ID
        id: String,

        /// Skip this many bytes of log output
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
}

/// Handle job commands
pub async fn handle_job_command(command: JobCommands, ctx: &Context) -> Result<()> {
    match command {
        JobCommands::Get { id } => get_job(ctx, &id).await,
        JobCommands::Watch {
            id,
            path,
            print_result,
        } => watch_job(ctx, parse_job_id(&id), path, print_result).await,
        JobCommands::Cancel { id } => cancel_job(ctx, &id).await,
        JobCommands::Result { id } => print_result(ctx, &id).await,
        JobCommands::Logs { id, offset } => print_logs(ctx, &id, offset).await,
    }
}

/// Parse a job ID, `None` when it is empty or malformed
pub(crate) fn parse_job_id(input: &str) -> Option<Uuid> {
    Uuid::parse_str(input.trim()).ok()
}

fn require_job_id(input: &str) -> Result<Uuid> {
    parse_job_id(input).with_context(|| format!("Invalid job ID: {:?}", input))
}

/// Open the live job view
pub(crate) async fn watch_job(
    ctx: &Context,
    job_id: Option<Uuid>,
    path: Option<String>,
    print_result: bool,
) -> Result<()> {
    let options = ViewOptions {
        path,
        print_result,
        poll_interval: ctx.config.poll_interval,
    };

    run_job_view(
        ctx.client.clone(),
        ctx.store.clone(),
        ctx.config.connection(),
        job_id,
        options,
    )
    .await
}

/// Fetch and render a job once
async fn get_job(ctx: &Context, id: &str) -> Result<()> {
    let job_id = require_job_id(id)?;
    let conn = ctx.config.connection();

    let details = ctx
        .client
        .get_job(job_id)
        .await
        .context("Failed to fetch job")?;
    let state = PollState::from_details(&conn, &details, Utc::now());

    println!("{}", state.rendered_markdown);
    if let Some(reason) = &details.canceled_reason {
        let by = details.canceled_by.as_deref().unwrap_or("unknown");
        println!("{} {} ({})", "Canceled by".dimmed(), by, reason);
    }

    Ok(())
}

/// Cancel a job and print the service's confirmation
async fn cancel_job(ctx: &Context, id: &str) -> Result<()> {
    let job_id = require_job_id(id)?;

    let reply = ctx
        .client
        .cancel_job(job_id)
        .await
        .context("Failed to cancel job")?;

    println!("{} {}", "✓".green(), reply.trim());

    Ok(())
}

/// Print the full result text of a completed job
async fn print_result(ctx: &Context, id: &str) -> Result<()> {
    let job_id = require_job_id(id)?;

    let details = ctx
        .client
        .get_job(job_id)
        .await
        .context("Failed to fetch job")?;

    if !details.is_completed_record() {
        anyhow::bail!("Job {} has not completed yet", job_id);
    }

    println!("{}", details.result_text());

    Ok(())
}

/// Print job logs from the incremental update endpoint
async fn print_logs(ctx: &Context, id: &str, offset: u64) -> Result<()> {
    let job_id = require_job_id(id)?;

    let update = ctx
        .client
        .get_job_update(job_id, false, offset)
        .await
        .context("Failed to fetch job logs")?;

    match update.new_logs.as_deref() {
        Some(logs) if !logs.is_empty() => {
            println!("{}", format!("Logs for job {}:", job_id).bold());
            println!("{}", "─".repeat(80).dimmed());
            print!("{}", logs);
            if !logs.ends_with('\n') {
                println!();
            }
            println!("{}", "─".repeat(80).dimmed());
        }
        _ => println!("{}", "No logs found for this job.".yellow()),
    }

    Ok(())
}
