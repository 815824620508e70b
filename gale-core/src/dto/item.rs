//! Summaries returned by the listing endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry of `scripts/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSummary {
    pub path: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Entry of `flows/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSummary {
    pub path: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
}

/// Entry of `variables/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSummary {
    pub path: String,
    /// Absent for secrets unless the caller may decrypt them
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default)]
    pub description: Option<String>,
}
