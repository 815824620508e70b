//! Progress rendering
//!
//! Turns a job snapshot into the markdown-ish status block shown by the job
//! view. Everything here is pure: the current time is passed in.

use chrono::{DateTime, SecondsFormat, Utc};
use gale_core::domain::job::{JobDetails, JobKind};
use gale_core::domain::workspace::WorkspaceConnection;

/// Number of segments in the progress bar
pub const BAR_SEGMENTS: u32 = 10;

/// Results at least this many characters long are not inlined
pub const RESULT_INLINE_LIMIT: usize = 1000;

/// Shown instead of a result too long to inline
pub const TOO_LONG_NOTICE: &str = "\n\nResult is too long to display. Copy it with `gale job result <job id>` instead.";

const FILLED: &str = "🟩";
const EMPTY: &str = "⬜";
const FAILED: &str = "🟥";

/// Display status of a job, in increasing precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Canceled,
}

impl JobStatus {
    /// Resolve the status of a snapshot
    ///
    /// `Canceled` wins over everything, then a completed record, then the
    /// running flag.
    pub fn resolve(details: &JobDetails) -> Self {
        if details.canceled {
            JobStatus::Canceled
        } else if details.is_completed_record() {
            JobStatus::Completed
        } else if details.running {
            JobStatus::Running
        } else {
            JobStatus::Queued
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Canceled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JobStatus::Queued => "Queued",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Canceled => "Canceled",
        };
        f.write_str(label)
    }
}

/// Progress percentage in `0..=100`
///
/// Flows report `step / modules`. Other jobs have no real progress signal, so
/// the number of seconds since start is used, capped at 100. A completed job
/// is always at 100.
pub fn progress(details: &JobDetails, status: JobStatus, now: DateTime<Utc>) -> u32 {
    if status == JobStatus::Completed {
        return 100;
    }

    let percent = if details.job_kind == JobKind::Flow {
        u64::from(details.current_step()) * 100 / u64::from(details.total_modules())
    } else {
        let elapsed_ms = (now - details.effective_start()).num_milliseconds().max(0);
        (elapsed_ms / 1000) as u64
    };

    percent.min(100) as u32
}

/// Ten-segment bar; all red for failed or canceled jobs
pub fn progress_bar(progress: u32, status: JobStatus, success: bool) -> String {
    let failed = status == JobStatus::Canceled || (status == JobStatus::Completed && !success);
    if failed {
        return FAILED.repeat(BAR_SEGMENTS as usize);
    }

    let filled = (progress / 10).min(BAR_SEGMENTS);
    format!(
        "{}{}",
        FILLED.repeat(filled as usize),
        EMPTY.repeat((BAR_SEGMENTS - filled) as usize)
    )
}

/// Result section body
pub fn result_body(result_text: &str, status: JobStatus) -> String {
    if result_text.is_empty() && !status.is_terminal() {
        return String::new();
    }

    if result_text.chars().count() < RESULT_INLINE_LIMIT {
        format!("```\n{}\n```", result_text)
    } else if status.is_terminal() {
        TOO_LONG_NOTICE.to_string()
    } else {
        String::new()
    }
}

/// Elapsed or total duration suffix for the status line
fn time_taken(details: &JobDetails, now: DateTime<Utc>) -> String {
    if details.is_completed_record() {
        let seconds = details.duration_ms.unwrap_or(0) as f64 / 1000.0;
        format!(" (ran in {}s)", seconds)
    } else {
        let elapsed_ms = (now - details.effective_start()).num_milliseconds();
        format!(" (running for {}s)", elapsed_ms as f64 / 1000.0)
    }
}

/// Render the full status block for one snapshot
pub fn render_progress(
    conn: &WorkspaceConnection,
    details: &JobDetails,
    result_text: &str,
    now: DateTime<Utc>,
) -> String {
    let status = JobStatus::resolve(details);
    let progress = progress(details, status, now);
    let bar = progress_bar(progress, status, details.success);
    let progress_emoji = if progress == 100 { "✅" } else { "⏳" };

    format!(
        "\n📜 {path}\n\n👤 by {creator}\n\n🆔 [{id}]({url})\n\n📅 started: {started}\n\n{bar} {emoji} {status}{taken}\n\n---\n\n### Result\n{body}\n",
        path = details.script_path.as_deref().unwrap_or("-"),
        creator = details.created_by,
        id = details.id,
        url = conn.job_url(details.id),
        started = details
            .effective_start()
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        bar = bar,
        emoji = progress_emoji,
        status = status,
        taken = time_taken(details, now),
        body = result_body(result_text, status),
    )
}
