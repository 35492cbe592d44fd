//! HTTP client for the analysis engine's database API.

use super::{AnalysisEngine, EngineError};
use async_trait::async_trait;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Client for the engine's database API (per-job queries and discovery analyses).
#[derive(Clone)]
pub struct EngineClient {
    base_url: String,
    client: reqwest::Client,
}

impl EngineClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// GET {base}/{path}/{jobid} — shared shape of the discovery endpoints.
    async fn discover(&self, path: &str, job_id: &str) -> Result<serde_json::Value, EngineError> {
        let url = format!("{}/{}/{}", self.base_url, path, job_id);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(EngineError::Api(format!("{} {}", status, body)));
        }
        Ok(res.json().await?)
    }
}

#[async_trait]
impl AnalysisEngine for EngineClient {
    /// POST {base}/query/{jobid} with the SQL text; returns the result rows.
    async fn execute_query(&self, job_id: &str, sql: &str) -> Result<serde_json::Value, EngineError> {
        let url = format!("{}/query/{}", self.base_url, job_id);
        let res = self
            .client
            .post(&url)
            .json(&json!({ "query": sql }))
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(EngineError::Api(format!("{} {}", status, body)));
        }
        Ok(res.json().await?)
    }

    async fn discover_batching_strategies(&self, job_id: &str) -> Result<serde_json::Value, EngineError> {
        self.discover("batching-strategies", job_id).await
    }

    async fn discover_prioritization_strategies(&self, job_id: &str) -> Result<serde_json::Value, EngineError> {
        self.discover("prioritization-strategies", job_id).await
    }

    async fn discover_case_attributes(&self, job_id: &str) -> Result<serde_json::Value, EngineError> {
        self.discover("case-attributes", job_id).await
    }

    async fn discover_resource_calendars(&self, job_id: &str) -> Result<serde_json::Value, EngineError> {
        self.discover("resource-calendars", job_id).await
    }
}
