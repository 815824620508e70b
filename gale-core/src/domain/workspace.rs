//! Workspace connection descriptor

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything needed to reach one workspace on the remote service
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConnection {
    /// Base URL, always ending with a single `/`
    base_url: String,
    pub workspace_id: String,
    pub token: String,
}

impl WorkspaceConnection {
    /// Create a connection, normalising the base URL to end with `/`
    pub fn new(
        base_url: impl Into<String>,
        workspace_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: format!("{}/", base_url.trim_end_matches('/')),
            workspace_id: workspace_id.into(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a workspace-scoped API route, e.g. `jobs_u/get/{id}`
    pub fn api_url(&self, route: &str) -> String {
        format!(
            "{}api/w/{}/{}",
            self.base_url,
            self.workspace_id,
            route.trim_start_matches('/')
        )
    }

    /// Link to the job page in the service's web UI
    pub fn job_url(&self, job_id: Uuid) -> String {
        format!(
            "{}run/{}?workspace={}",
            self.base_url, job_id, self.workspace_id
        )
    }

    /// Link to the past runs of a script or flow in the service's web UI
    pub fn past_runs_url(&self, path: &str) -> String {
        format!(
            "{}runs/{}?workspace={}",
            self.base_url, path, self.workspace_id
        )
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for WorkspaceConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceConnection")
            .field("base_url", &self.base_url)
            .field("workspace_id", &self.workspace_id)
            .field("token", &"***")
            .finish()
    }
}
