//! Gateway HTTP wire types (start, process, status).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body of `POST /start`. jobId, message and instructions are required
/// (validated by the handler); the rest tunes the run and the tool set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub message: String,
    /// Model override for this conversation's runs.
    #[serde(default)]
    pub model: Option<String>,
    /// System prompt for the run.
    #[serde(default)]
    pub instructions: String,
    /// Extra instructions appended after `instructions` by the remote service.
    #[serde(default)]
    pub assistant_instructions: Option<String>,
    /// Tool name -> description override.
    #[serde(default)]
    pub function_descriptions: Option<HashMap<String, String>>,
    /// Tool name -> enabled. The SQL query tool and the resource-calendar tool
    /// are offered regardless of this map.
    #[serde(default)]
    pub function_status: Option<HashMap<String, bool>>,
}

/// Body of `POST /process` (continue an existing conversation).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub instructions: String,
}

/// Response of `POST /start` and `POST /process`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub thread_id: String,
    pub run_id: String,
}

/// Response of `GET /status/:jobid/:threadid/:runid`.
///
/// The singular function fields describe the last dispatched call of a batch;
/// `function_results` carries every call of the batch, in order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_arguments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_results: Option<Vec<FunctionResult>>,
}

impl StatusResponse {
    /// A status-only response (pending or completed).
    pub fn plain(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
            function_name: None,
            function_arguments: None,
            function_result: None,
            function_results: None,
        }
    }
}

/// One dispatched tool call in a status response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResult {
    pub name: String,
    pub arguments: String,
    pub result: String,
}
