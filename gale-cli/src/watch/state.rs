//! Per-view poll state

use chrono::{DateTime, Utc};
use gale_core::domain::job::JobDetails;
use gale_core::domain::workspace::WorkspaceConnection;
use uuid::Uuid;

use super::render::{JobStatus, render_progress};

/// Rendered instead of polling when the view has no job to show
pub const MISSING_JOB_MARKDOWN: &str = "An error occurred.";

/// State of a job view, recomputed from every snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    pub is_loading: bool,
    pub completed: bool,
    pub success: bool,
    /// Full result text; empty until the job reaches a terminal state
    pub result_text: String,
    pub rendered_markdown: String,
}

impl PollState {
    /// Initial state before the first snapshot arrives
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            completed: false,
            success: false,
            result_text: String::new(),
            rendered_markdown: String::new(),
        }
    }

    /// Static state for a view opened without a job
    pub fn missing_job() -> Self {
        Self {
            is_loading: false,
            completed: true,
            success: false,
            result_text: String::new(),
            rendered_markdown: MISSING_JOB_MARKDOWN.to_string(),
        }
    }

    /// Project a snapshot into view state
    pub fn from_details(
        conn: &WorkspaceConnection,
        details: &JobDetails,
        now: DateTime<Utc>,
    ) -> Self {
        let status = JobStatus::resolve(details);
        let completed = status.is_terminal();
        let result_text = if details.is_completed_record() {
            details.result_text()
        } else {
            String::new()
        };
        let rendered_markdown = render_progress(conn, details, &result_text, now);

        Self {
            is_loading: !completed,
            completed,
            success: details.is_completed_record() && details.success && !details.canceled,
            result_text,
            rendered_markdown,
        }
    }

    /// Mark the job completed locally after the user asked to cancel it
    ///
    /// The rendered block keeps the last snapshot.
    pub fn cancel_locally(&mut self) {
        self.completed = true;
        self.is_loading = false;
    }

    /// Actions the view offers in this state
    pub fn actions(
        &self,
        conn: &WorkspaceConnection,
        job_id: Uuid,
        path: Option<&str>,
    ) -> Vec<JobAction> {
        let mut actions = vec![JobAction::OpenJob(conn.job_url(job_id))];
        if self.completed && self.success {
            actions.push(JobAction::CopyResult);
        }
        if !self.completed {
            actions.push(JobAction::Cancel);
        }
        if let Some(path) = path {
            actions.push(JobAction::OpenPastRuns(conn.past_runs_url(path)));
        }
        actions
    }
}

/// An action offered by the job view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobAction {
    OpenJob(String),
    CopyResult,
    Cancel,
    OpenPastRuns(String),
}

impl JobAction {
    pub fn title(&self) -> &'static str {
        match self {
            JobAction::OpenJob(_) => "Open Job",
            JobAction::CopyResult => "Copy Result",
            JobAction::Cancel => "Cancel Job",
            JobAction::OpenPastRuns(_) => "Open Past Runs",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::render::tests::{completed, script_job};

    fn conn() -> WorkspaceConnection {
        WorkspaceConnection::new("https://wm.example.com", "demo", "t")
    }

    #[test]
    fn test_running_state() {
        let now = Utc::now();
        let state = PollState::from_details(&conn(), &script_job(now), now);
        assert!(state.is_loading);
        assert!(!state.completed);
        assert!(state.result_text.is_empty());
        assert!(state.rendered_markdown.contains("Running"));

        let actions = state.actions(&conn(), Uuid::nil(), Some("u/alice/hello"));
        assert!(actions.contains(&JobAction::Cancel));
        assert!(!actions.contains(&JobAction::CopyResult));
        assert!(actions.contains(&JobAction::OpenPastRuns(
            "https://wm.example.com/runs/u/alice/hello?workspace=demo".to_string()
        )));
    }

    #[test]
    fn test_completed_state_offers_copy() {
        let now = Utc::now();
        let state = PollState::from_details(&conn(), &completed(script_job(now), true, "ok"), now);
        assert!(!state.is_loading);
        assert!(state.completed);
        assert!(state.success);
        assert_eq!(state.result_text, "ok");

        let actions = state.actions(&conn(), Uuid::nil(), None);
        assert_eq!(
            actions,
            vec![
                JobAction::OpenJob(conn().job_url(Uuid::nil())),
                JobAction::CopyResult,
            ]
        );
    }

    #[test]
    fn test_failed_state_offers_no_copy() {
        let now = Utc::now();
        let job = completed(script_job(now), false, "boom");
        let state = PollState::from_details(&conn(), &job, now);
        assert!(state.completed);
        assert!(!state.success);
        assert!(!state.actions(&conn(), Uuid::nil(), None).contains(&JobAction::CopyResult));
    }

    #[test]
    fn test_canceled_state_is_terminal() {
        let now = Utc::now();
        let mut job = script_job(now);
        job.canceled = true;
        let state = PollState::from_details(&conn(), &job, now);
        assert!(state.completed);
        assert!(!state.success);
        assert!(
            state
                .rendered_markdown
                .contains("🟥🟥🟥🟥🟥🟥🟥🟥🟥🟥 ⏳ Canceled")
        );
        assert!(!state.actions(&conn(), Uuid::nil(), None).contains(&JobAction::Cancel));
    }

    #[test]
    fn test_cancel_locally_keeps_render() {
        let now = Utc::now();
        let mut state = PollState::from_details(&conn(), &script_job(now), now);
        let before = state.rendered_markdown.clone();
        state.cancel_locally();
        assert!(state.completed);
        assert!(!state.is_loading);
        assert_eq!(state.rendered_markdown, before);
        assert!(!state.actions(&conn(), Uuid::nil(), None).contains(&JobAction::Cancel));
    }

    #[test]
    fn test_missing_job_state() {
        let state = PollState::missing_job();
        assert_eq!(state.rendered_markdown, MISSING_JOB_MARKDOWN);
        assert!(!state.is_loading);
    }
}
