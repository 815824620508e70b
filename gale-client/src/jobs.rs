//! Job-related API endpoints

use crate::WindmillClient;
use crate::error::{ClientError, Result};
use gale_core::domain::job::JobDetails;
use gale_core::dto::job::{CancelJobRequest, JobUpdate};
use uuid::Uuid;

/// Reason attached to every cancel request sent by this client
pub const CANCEL_REASON: &str = "Canceled by user from gale CLI";

impl WindmillClient {
    // =============================================================================
    // Job Status
    // =============================================================================

    /// Get a job by ID
    ///
    /// Works for queued, running and completed jobs alike; the record's
    /// `job_type` says which.
    pub async fn get_job(&self, job_id: Uuid) -> Result<JobDetails> {
        let response = self
            .get(&format!("jobs_u/get/{}", job_id))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get an incremental update for a job
    ///
    /// # Arguments
    /// * `job_id` - The job UUID
    /// * `running` - Whether the caller last saw the job running
    /// * `log_offset` - Number of log bytes the caller already has
    pub async fn get_job_update(
        &self,
        job_id: Uuid,
        running: bool,
        log_offset: u64,
    ) -> Result<JobUpdate> {
        let response = self
            .get(&format!("jobs_u/getupdate/{}", job_id))
            .query(&[
                ("running", running.to_string()),
                ("log_offset", log_offset.to_string()),
            ])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Cancel a queued or running job
    ///
    /// # Returns
    /// The service's plain-text confirmation
    pub async fn cancel_job(&self, job_id: Uuid) -> Result<String> {
        let response = self
            .post(&format!("jobs_u/queue/cancel/{}", job_id))
            .json(&CancelJobRequest {
                reason: CANCEL_REASON.to_string(),
            })
            .send()
            .await?;

        self.handle_text_response(response).await
    }

    // =============================================================================
    // Job Launch
    // =============================================================================

    /// Run the latest version of a script by path
    ///
    /// # Arguments
    /// * `path` - Script path, e.g. `u/alice/hello`
    /// * `args` - JSON object of script arguments
    ///
    /// # Returns
    /// The ID of the queued job
    pub async fn run_script(&self, path: &str, args: serde_json::Value) -> Result<Uuid> {
        self.run(&format!("jobs/run/p/{}", path), args).await
    }

    /// Run a flow by path
    ///
    /// # Returns
    /// The ID of the queued job
    pub async fn run_flow(&self, path: &str, args: serde_json::Value) -> Result<Uuid> {
        self.run(&format!("jobs/run/f/{}", path), args).await
    }

    async fn run(&self, route: &str, args: serde_json::Value) -> Result<Uuid> {
        let response = self.post(route).json(&args).send().await?;
        let body = self.handle_text_response(response).await?;

        parse_job_id(&body)
    }
}

/// Parse the job ID the run endpoints answer with
///
/// The body is the bare UUID, sometimes JSON-quoted.
fn parse_job_id(body: &str) -> Result<Uuid> {
    let trimmed = body.trim().trim_matches('"');
    Uuid::parse_str(trimmed)
        .map_err(|e| ClientError::ParseError(format!("Invalid job id {:?}: {}", trimmed, e)))
}
