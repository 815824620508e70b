//! Script, flow and variable listing endpoints

use crate::WindmillClient;
use crate::error::Result;
use gale_core::dto::item::{FlowSummary, ScriptSummary, VariableSummary};

impl WindmillClient {
    /// List the scripts of the workspace
    pub async fn list_scripts(&self) -> Result<Vec<ScriptSummary>> {
        let response = self.get("scripts/list").send().await?;

        self.handle_response(response).await
    }

    /// List the flows of the workspace
    pub async fn list_flows(&self) -> Result<Vec<FlowSummary>> {
        let response = self.get("flows/list").send().await?;

        self.handle_response(response).await
    }

    /// List the variables of the workspace
    pub async fn list_variables(&self) -> Result<Vec<VariableSummary>> {
        let response = self.get("variables/list").send().await?;

        self.handle_response(response).await
    }
}
