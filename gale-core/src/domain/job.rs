//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job execution record
///
/// Snapshot returned by the job-detail endpoint. The service sends the same
/// shape for queued and completed jobs and tells them apart through `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetails {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub parent_job: Option<Uuid>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Only present on completed records
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub canceled: bool,
    #[serde(default)]
    pub canceled_by: Option<String>,
    #[serde(default)]
    pub canceled_reason: Option<String>,
    #[serde(default)]
    pub script_path: Option<String>,
    #[serde(default)]
    pub script_hash: Option<String>,
    pub job_kind: JobKind,
    #[serde(default)]
    pub args: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub logs: Option<String>,
    #[serde(default)]
    pub flow_status: Option<FlowStatus>,
    #[serde(default)]
    pub is_flow_step: bool,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mem_peak: Option<i64>,
    #[serde(default)]
    pub tag: Option<String>,
}

/// Which table the service read the record from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    QueuedJob,
    CompletedJob,
}

/// Kind of work a job executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Script,
    Preview,
    Dependencies,
    Flow,
    #[serde(rename = "flowpreview")]
    FlowPreview,
    #[serde(rename = "flowdependencies")]
    FlowDependencies,
    #[serde(rename = "appdependencies")]
    AppDependencies,
    Identity,
    Http,
    #[serde(other)]
    Other,
}

/// Progress of a flow job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowStatus {
    #[serde(default)]
    pub step: Option<u32>,
    #[serde(default)]
    pub modules: Vec<FlowModuleStatus>,
}

/// Status of a single module (step) inside a flow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowModuleStatus {
    #[serde(rename = "type", default)]
    pub status: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub job: Option<Uuid>,
    #[serde(default)]
    pub count: Option<u32>,
}

impl JobDetails {
    /// True when the service returned the record from its completed-jobs table
    pub fn is_completed_record(&self) -> bool {
        self.job_type == JobType::CompletedJob
    }

    /// Start of execution, falling back to creation time for jobs still queued
    pub fn effective_start(&self) -> DateTime<Utc> {
        self.started_at.unwrap_or(self.created_at)
    }

    /// Index of the flow step currently executing (0 when unknown)
    pub fn current_step(&self) -> u32 {
        self.flow_status
            .as_ref()
            .and_then(|status| status.step)
            .unwrap_or(0)
    }

    /// Number of modules in the flow, never less than 1
    pub fn total_modules(&self) -> u32 {
        let modules = self
            .flow_status
            .as_ref()
            .map(|status| status.modules.len())
            .unwrap_or(0);
        u32::try_from(modules).unwrap_or(u32::MAX).max(1)
    }

    /// Textual representation of the result payload
    ///
    /// Strings are returned as-is; anything else is pretty-printed JSON with a
    /// four-space indent. A missing result renders as `null`.
    pub fn result_text(&self) -> String {
        match &self.result {
            Some(serde_json::Value::String(text)) => text.clone(),
            Some(value) => pretty_json(value),
            None => "null".to_string(),
        }
    }
}

fn pretty_json(value: &serde_json::Value) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn queued_flow() -> serde_json::Value {
        json!({
            "id": "0191e6c2-6d3a-7c1e-9d3b-2a4f5e6a7b8c",
            "type": "QueuedJob",
            "workspace_id": "demo",
            "created_by": "alice",
            "created_at": "2024-05-01T10:00:00Z",
            "started_at": "2024-05-01T10:00:01Z",
            "running": true,
            "canceled": false,
            "job_kind": "flow",
            "script_path": "f/etl/daily",
            "flow_status": {
                "step": 1,
                "modules": [
                    { "type": "Success", "id": "a" },
                    { "type": "InProgress", "id": "b" },
                    { "type": "WaitingForPriorSteps", "id": "c" }
                ]
            },
            "permissioned_as": "u/alice",
            "visible_to_owner": true
        })
    }

    #[test]
    fn test_deserialize_queued_flow() {
        let details: JobDetails = serde_json::from_value(queued_flow()).unwrap();
        assert_eq!(details.job_type, JobType::QueuedJob);
        assert_eq!(details.job_kind, JobKind::Flow);
        assert!(details.running);
        assert!(!details.success);
        assert_eq!(details.current_step(), 1);
        assert_eq!(details.total_modules(), 3);
        assert_eq!(
            details.flow_status.unwrap().modules[1].status.as_deref(),
            Some("InProgress")
        );
    }

    #[test]
    fn test_unknown_job_kind_is_other() {
        let mut raw = queued_flow();
        raw["job_kind"] = json!("deploymentcallback");
        let details: JobDetails = serde_json::from_value(raw).unwrap();
        assert_eq!(details.job_kind, JobKind::Other);
    }

    #[test]
    fn test_total_modules_defaults_to_one() {
        let mut raw = queued_flow();
        raw.as_object_mut().unwrap().remove("flow_status");
        let details: JobDetails = serde_json::from_value(raw).unwrap();
        assert_eq!(details.total_modules(), 1);
        assert_eq!(details.current_step(), 0);

        let mut raw = queued_flow();
        raw["flow_status"]["modules"] = json!([]);
        let details: JobDetails = serde_json::from_value(raw).unwrap();
        assert_eq!(details.total_modules(), 1);
    }

    #[test]
    fn test_effective_start_falls_back_to_created_at() {
        let mut raw = queued_flow();
        raw["started_at"] = serde_json::Value::Null;
        let details: JobDetails = serde_json::from_value(raw).unwrap();
        assert_eq!(details.effective_start(), details.created_at);
    }

    #[test]
    fn test_result_text() {
        let mut raw = queued_flow();
        raw["result"] = json!("ok");
        let details: JobDetails = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(details.result_text(), "ok");

        raw["result"] = json!({ "rows": 2 });
        let details: JobDetails = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(details.result_text(), "{\n    \"rows\": 2\n}");

        raw.as_object_mut().unwrap().remove("result");
        let details: JobDetails = serde_json::from_value(raw).unwrap();
        assert_eq!(details.result_text(), "null");
    }
}
