//! Terminal job view
//!
//! Redraws the rendered status block on every state change and reads simple
//! line commands from stdin (`c` cancels, `q` quits).

use anyhow::Result;
use colored::*;
use gale_core::domain::workspace::WorkspaceConnection;
use std::fmt::Write as _;
use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::poller::{JobPoller, JobSource, StopReason};
use super::state::{JobAction, PollState};
use crate::store::ExecTimeStore;

/// How long background requests may still run once the view has stopped
const SETTLE_GRACE: Duration = Duration::from_secs(3);

/// Options for a job view
#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Script or flow path the job was started from
    pub path: Option<String>,
    /// Print the full result once the job succeeded
    pub print_result: bool,
    pub poll_interval: Duration,
}

/// Follow a job until it stops, the user cancels it, or the user quits
pub async fn run_job_view(
    source: Arc<dyn JobSource>,
    store: Arc<dyn ExecTimeStore>,
    conn: WorkspaceConnection,
    job_id: Option<Uuid>,
    options: ViewOptions,
) -> Result<()> {
    let Some(job_id) = job_id else {
        println!("{}", PollState::missing_job().rendered_markdown);
        return Ok(());
    };

    let handle = JobPoller::new(
        source,
        store,
        conn.clone(),
        job_id,
        options.path.clone(),
        options.poll_interval,
    )
    .spawn();
    let mut state_rx = handle.subscribe();
    let mut input = spawn_input_reader();
    draw(&handle.current(), &conn, job_id, options.path.as_deref());

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                draw(&state, &conn, job_id, options.path.as_deref());
                if state.completed {
                    break;
                }
            }
            Some(line) = input.recv() => match line.as_str() {
                "c" | "cancel" => {
                    if handle.current().completed {
                        println!("{}", "Job already completed.".yellow());
                    } else {
                        handle.cancel().await;
                    }
                }
                "q" | "quit" => handle.quit().await,
                other => debug!("Ignoring input {:?}", other),
            },
            _ = tokio::signal::ctrl_c() => {
                handle.quit().await;
            }
        }
    }

    let outcome = handle.join().await;
    let state = state_rx.borrow().clone();
    let reason = outcome.settle(SETTLE_GRACE).await;

    match reason {
        StopReason::CanceledLocally => println!("{}", "Cancel requested.".yellow()),
        StopReason::Detached => {
            println!("{}", "Stopped watching; the job keeps running.".dimmed())
        }
        StopReason::Terminal => {}
    }

    if options.print_result && state.completed && state.success {
        println!("{}", state.result_text);
    }

    Ok(())
}

/// Forward stdin lines to the view
///
/// Runs on a plain thread: a blocking stdin read cannot be cancelled and must
/// not hold up runtime shutdown.
fn spawn_input_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    if std::io::stdin().is_terminal() {
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line.trim().to_lowercase()).is_err() {
                    break;
                }
            }
        });
    }

    rx
}

/// Print one frame; the screen is only cleared when stdout is a terminal,
/// so piped output gets every frame in sequence
fn draw(state: &PollState, conn: &WorkspaceConnection, job_id: Uuid, path: Option<&str>) {
    let clear = std::io::stdout().is_terminal();
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(frame(state, conn, job_id, path, clear).as_bytes());
    let _ = out.flush();
}

fn frame(
    state: &PollState,
    conn: &WorkspaceConnection,
    job_id: Uuid,
    path: Option<&str>,
    clear: bool,
) -> String {
    let mut out = String::new();
    if clear {
        // Clear screen, cursor home
        out.push_str("\x1B[2J\x1B[H");
    }

    if state.rendered_markdown.is_empty() {
        let _ = writeln!(out, "{}", "Loading...".dimmed());
    } else {
        let _ = writeln!(out, "{}", state.rendered_markdown);
    }

    let _ = writeln!(out, "{}", "Actions:".bold());
    for action in state.actions(conn, job_id, path) {
        let hint = match &action {
            JobAction::OpenJob(url) | JobAction::OpenPastRuns(url) => url.cyan().to_string(),
            JobAction::CopyResult => format!("gale job result {}", job_id).cyan().to_string(),
            JobAction::Cancel => "type c + Enter".cyan().to_string(),
        };
        let _ = writeln!(out, "  {} {:<15} {}", "▸".cyan(), action.title(), hint);
    }
    if !state.completed {
        let _ = writeln!(out, "  {} {:<15} {}", "▸".cyan(), "Quit", "type q + Enter".cyan());
    }
    out
}
