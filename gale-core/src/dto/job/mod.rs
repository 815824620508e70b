//! Job DTOs

use serde::{Deserialize, Serialize};

/// Body of a cancel request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelJobRequest {
    pub reason: String,
}

/// Incremental job update returned by the `getupdate` endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobUpdate {
    #[serde(default)]
    pub running: Option<bool>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub new_logs: Option<String>,
    #[serde(default)]
    pub mem_peak: Option<i64>,
}
