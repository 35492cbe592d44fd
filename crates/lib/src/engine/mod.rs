//! Analysis engine seam: the external service that owns per-job result tables
//! and the discovery analyses (batching, prioritization, case attributes,
//! resource calendars).

mod http;

pub use http::EngineClient;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("engine api error: {0}")]
    Api(String),
}

/// Read-only queries and discovery analyses against a job's results.
/// Implemented over HTTP by [`EngineClient`]; tests use scripted fakes.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Execute a read-only SQL query against the job's result store; returns rows as JSON.
    async fn execute_query(&self, job_id: &str, sql: &str) -> Result<serde_json::Value, EngineError>;

    async fn discover_batching_strategies(&self, job_id: &str) -> Result<serde_json::Value, EngineError>;

    async fn discover_prioritization_strategies(&self, job_id: &str) -> Result<serde_json::Value, EngineError>;

    async fn discover_case_attributes(&self, job_id: &str) -> Result<serde_json::Value, EngineError>;

    async fn discover_resource_calendars(&self, job_id: &str) -> Result<serde_json::Value, EngineError>;
}

/// Result-table identifier for a job, matching the engine's naming scheme:
/// `job_` plus the job id with every non-alphanumeric character replaced by `_`.
pub fn sanitize_table_name(job_id: &str) -> String {
    let mut name = String::with_capacity(job_id.len() + 4);
    name.push_str("job_");
    for c in job_id.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c);
        } else {
            name.push('_');
        }
    }
    name
}
