//! Gale HTTP Client
//!
//! A small, type-safe HTTP client for the workspace API of a Windmill-style
//! orchestration service.
//!
//! Every request is scoped to one workspace and authenticated with the
//! workspace's bearer token.
//!
//! # Example
//!
//! ```no_run
//! use gale_client::WindmillClient;
//! use gale_core::domain::workspace::WorkspaceConnection;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let conn = WorkspaceConnection::new("https://app.windmill.dev", "demo", "token");
//!     let client = WindmillClient::new(conn);
//!
//!     let job_id = client.run_script("u/alice/hello", serde_json::json!({})).await?;
//!     let job = client.get_job(job_id).await?;
//!     println!("{} is {:?}", job.id, job.job_type);
//!     Ok(())
//! }
//! ```

pub mod error;
mod items;
mod jobs;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use jobs::CANCEL_REASON;

use gale_core::domain::workspace::WorkspaceConnection;
use reqwest::{Client, RequestBuilder, header};
use serde::de::DeserializeOwned;
use tracing::trace;

/// HTTP client for one workspace of the remote service
///
/// Methods are grouped by resource:
/// - Jobs (details, incremental updates, cancel, run)
/// - Items (scripts, flows, variables)
#[derive(Debug, Clone)]
pub struct WindmillClient {
    /// Workspace the client talks to
    conn: WorkspaceConnection,
    /// HTTP client instance
    client: Client,
}

impl WindmillClient {
    /// Create a new client for a workspace
    ///
    /// # Example
    /// ```
    /// use gale_client::WindmillClient;
    /// use gale_core::domain::workspace::WorkspaceConnection;
    ///
    /// let conn = WorkspaceConnection::new("http://localhost:8000", "demo", "token");
    /// let client = WindmillClient::new(conn);
    /// ```
    pub fn new(conn: WorkspaceConnection) -> Self {
        Self {
            conn,
            client: Client::new(),
        }
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(conn: WorkspaceConnection, client: Client) -> Self {
        Self { conn, client }
    }

    /// Workspace this client is bound to
    pub fn connection(&self) -> &WorkspaceConnection {
        &self.conn
    }

    // =============================================================================
    // Request Builders
    // =============================================================================

    fn get(&self, route: &str) -> RequestBuilder {
        let url = self.conn.api_url(route);
        trace!("GET {}", url);
        self.authorize(self.client.get(url))
    }

    fn post(&self, route: &str) -> RequestBuilder {
        let url = self.conn.api_url(route);
        trace!("POST {}", url);
        self.authorize(self.client.post(url))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.conn.token)
            .header(header::CONTENT_TYPE, "application/json")
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Check the status code and return the body as plain text
    async fn handle_text_response(&self, response: reqwest::Response) -> Result<String> {
        let response = Self::check_status(response).await?;

        response
            .text()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to read response body: {}", e)))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}
