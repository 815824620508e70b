//! Script, flow and variable command handlers
//!
//! Listing shows each item together with when it was last executed from this
//! machine; running queues a job and opens the job view on it.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Local};
use clap::Subcommand;
use colored::*;
use tracing::warn;

use super::Context;
use super::job::watch_job;
use crate::store::ExecTimeStore;

/// Subcommands shared by scripts and flows
#[derive(Subcommand)]
pub enum RunnableCommands {
    /// List all items of the workspace
    List,
    /// Run an item and follow the resulting job
    Run {
        /// Item path, e.g. u/alice/hello
        path: String,

        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        /// Print the job ID and exit without following the job
        #[arg(long)]
        no_watch: bool,

        /// Print the full result once the job succeeded
        #[arg(long)]
        print_result: bool,
    },
}

/// Variable subcommands
#[derive(Subcommand)]
pub enum VariableCommands {
    /// List all variables of the workspace
    List,
}

/// Which kind of runnable a command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnableKind {
    Script,
    Flow,
}

impl RunnableKind {
    fn noun(self) -> &'static str {
        match self {
            RunnableKind::Script => "script",
            RunnableKind::Flow => "flow",
        }
    }
}

/// Handle script and flow commands
pub async fn handle_runnable_command(
    kind: RunnableKind,
    command: RunnableCommands,
    ctx: &Context,
) -> Result<()> {
    match command {
        RunnableCommands::List => list_runnables(kind, ctx).await,
        RunnableCommands::Run {
            path,
            args,
            no_watch,
            print_result,
        } => run(kind, ctx, &path, &args, no_watch, print_result).await,
    }
}

/// Handle variable commands
pub async fn handle_variable_command(command: VariableCommands, ctx: &Context) -> Result<()> {
    match command {
        VariableCommands::List => list_variables(ctx).await,
    }
}

/// One row of a listing
struct Row {
    path: String,
    summary: Option<String>,
}

async fn list_runnables(kind: RunnableKind, ctx: &Context) -> Result<()> {
    let rows: Vec<Row> = match kind {
        RunnableKind::Script => ctx
            .client
            .list_scripts()
            .await
            .context("Failed to list scripts")?
            .into_iter()
            .map(|s| Row {
                path: s.path,
                summary: s.summary,
            })
            .collect(),
        RunnableKind::Flow => ctx
            .client
            .list_flows()
            .await
            .context("Failed to list flows")?
            .into_iter()
            .map(|f| Row {
                path: f.path,
                summary: f.summary,
            })
            .collect(),
    };

    if rows.is_empty() {
        println!("{}", format!("No {}s found.", kind.noun()).yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} {}(s):", rows.len(), kind.noun()).bold());
    println!();
    for row in rows {
        let last_run = last_exec_time(ctx, &row.path).await;
        print_row(&row, last_run.as_deref());
    }

    Ok(())
}

async fn list_variables(ctx: &Context) -> Result<()> {
    let variables = ctx
        .client
        .list_variables()
        .await
        .context("Failed to list variables")?;

    if variables.is_empty() {
        println!("{}", "No variables found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} variable(s):", variables.len()).bold());
    println!();
    for variable in variables {
        let value = match (&variable.value, variable.is_secret) {
            (_, true) => "(secret)".dimmed().to_string(),
            (Some(value), false) => value.clone(),
            (None, false) => "-".dimmed().to_string(),
        };
        println!("  {} {}", "▸".cyan(), variable.path);
        println!("    Value:    {}", value);
        if let Some(description) = variable.description.filter(|d| !d.is_empty()) {
            println!("    About:    {}", description.dimmed());
        }
        println!();
    }

    Ok(())
}

/// Queue a job for the item and follow it
async fn run(
    kind: RunnableKind,
    ctx: &Context,
    path: &str,
    args: &str,
    no_watch: bool,
    print_result: bool,
) -> Result<()> {
    let args = parse_args(args)?;

    let job_id = match kind {
        RunnableKind::Script => ctx.client.run_script(path, args).await,
        RunnableKind::Flow => ctx.client.run_flow(path, args).await,
    }
    .with_context(|| format!("Failed to run {} {}", kind.noun(), path))?;

    if no_watch {
        println!("{}", job_id);
        return Ok(());
    }

    println!("{} Started job {}", "✓".green(), job_id.to_string().cyan());
    watch_job(ctx, Some(job_id), Some(path.to_string()), print_result).await
}

/// Parse `--args`, which must be a JSON object
fn parse_args(raw: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("Arguments are not valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("Arguments must be a JSON object");
    }
    Ok(value)
}

/// Formatted local time of the last execution, if one was recorded
async fn last_exec_time(ctx: &Context, path: &str) -> Option<String> {
    match ctx.store.last_exec_time(path).await {
        Ok(Some(epoch_ms)) => DateTime::from_timestamp_millis(epoch_ms).map(|at| {
            at.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        }),
        Ok(None) => None,
        Err(e) => {
            warn!("Failed to read last execution time for {}: {}", path, e);
            None
        }
    }
}

fn print_row(row: &Row, last_run: Option<&str>) {
    println!("  {} {}", "▸".cyan(), row.path);
    if let Some(summary) = row.summary.as_deref().filter(|s| !s.is_empty()) {
        println!("    Summary:  {}", summary);
    }
    if let Some(last_run) = last_run {
        println!("    Last run: {}", last_run.dimmed());
    }
    println!();
}
