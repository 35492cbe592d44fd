//! Hosted Assistants API client (v2 threads/runs/messages endpoints).

use super::{AssistantBackend, AssistantError, RunSpec, RunState, ToolInvocation, ToolOutput};
use crate::catalog::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VALUE: &str = "assistants=v2";

/// Client for the hosted assistant service. One pre-configured assistant id;
/// threads and runs are created per conversation.
#[derive(Clone)]
pub struct AssistantClient {
    base_url: String,
    api_key: String,
    assistant_id: String,
    client: reqwest::Client,
}

impl AssistantClient {
    pub fn new(api_key: String, assistant_id: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            api_key,
            assistant_id,
            client: reqwest::Client::new(),
        }
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VALUE)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VALUE)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    res: reqwest::Response,
) -> Result<T, AssistantError> {
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        return Err(AssistantError::Api(format!("{} {}", status, body)));
    }
    Ok(res.json().await?)
}

#[async_trait]
impl AssistantBackend for AssistantClient {
    /// POST /threads — create an empty conversation thread.
    async fn create_thread(&self) -> Result<String, AssistantError> {
        let url = format!("{}/threads", self.base_url);
        let res = self.post(&url).json(&json!({})).send().await?;
        let data: ObjectWithId = read_json(res).await?;
        Ok(data.id)
    }

    /// POST /threads/{t}/messages — append a user message.
    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<(), AssistantError> {
        let url = format!("{}/threads/{}/messages", self.base_url, thread_id);
        let body = json!({ "role": "user", "content": content });
        let res = self.post(&url).json(&body).send().await?;
        let _: ObjectWithId = read_json(res).await?;
        Ok(())
    }

    /// POST /threads/{t}/runs — submit the thread for processing.
    async fn create_run(&self, thread_id: &str, spec: RunSpec) -> Result<String, AssistantError> {
        let url = format!("{}/threads/{}/runs", self.base_url, thread_id);
        let body = CreateRunRequest {
            assistant_id: self.assistant_id.clone(),
            instructions: spec.instructions,
            additional_instructions: spec.additional_instructions,
            model: spec.model,
            tools: spec.tools,
        };
        let res = self.post(&url).json(&body).send().await?;
        let data: RunObject = read_json(res).await?;
        Ok(data.id)
    }

    /// GET /threads/{t}/runs/{r} — run status and pending tool calls.
    async fn run_state(&self, thread_id: &str, run_id: &str) -> Result<RunState, AssistantError> {
        let url = format!("{}/threads/{}/runs/{}", self.base_url, thread_id, run_id);
        let res = self.get(&url).send().await?;
        let data: RunObject = read_json(res).await?;
        Ok(run_object_to_state(data))
    }

    /// GET /threads/{t}/messages — newest first; returns the first assistant
    /// message's text content, if any.
    async fn latest_assistant_message(&self, thread_id: &str) -> Result<Option<String>, AssistantError> {
        let url = format!("{}/threads/{}/messages", self.base_url, thread_id);
        let res = self.get(&url).send().await?;
        let data: MessageListResponse = read_json(res).await?;
        let text = data
            .data
            .unwrap_or_default()
            .into_iter()
            .find(|m| m.role.as_deref() == Some("assistant"))
            .and_then(|m| {
                m.content.into_iter().find_map(|c| {
                    if c.typ.as_deref() == Some("text") {
                        c.text.map(|t| t.value)
                    } else {
                        None
                    }
                })
            })
            .filter(|s| !s.is_empty());
        Ok(text)
    }

    /// POST /threads/{t}/runs/{r}/submit_tool_outputs — unblock a run.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<RunState, AssistantError> {
        let url = format!(
            "{}/threads/{}/runs/{}/submit_tool_outputs",
            self.base_url, thread_id, run_id
        );
        let body = SubmitToolOutputsRequest {
            tool_outputs: outputs
                .into_iter()
                .map(|o| ToolOutputItem {
                    tool_call_id: o.tool_call_id,
                    output: o.output,
                })
                .collect(),
        };
        let res = self.post(&url).json(&body).send().await?;
        let data: RunObject = read_json(res).await?;
        Ok(run_object_to_state(data))
    }
}

fn run_object_to_state(run: RunObject) -> RunState {
    let pending_calls = run
        .required_action
        .and_then(|a| a.submit_tool_outputs)
        .map(|s| s.tool_calls)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| {
            c.function.map(|f| ToolInvocation {
                id: c.id,
                name: f.name,
                arguments: f.arguments.unwrap_or_default(),
            })
        })
        .collect();
    RunState {
        status: run.status.unwrap_or_default(),
        pending_calls,
    }
}

// --- wire types ---

#[derive(Debug, Deserialize)]
struct ObjectWithId {
    id: String,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest {
    assistant_id: String,
    instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition>,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    required_action: Option<RequiredAction>,
}

#[derive(Debug, Deserialize)]
struct RequiredAction {
    #[serde(default)]
    submit_tool_outputs: Option<SubmitToolOutputsAction>,
}

#[derive(Debug, Deserialize)]
struct SubmitToolOutputsAction {
    #[serde(default)]
    tool_calls: Vec<RunToolCall>,
}

#[derive(Debug, Deserialize)]
struct RunToolCall {
    id: String,
    #[serde(default)]
    function: Option<RunToolCallFunction>,
}

#[derive(Debug, Deserialize)]
struct RunToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    data: Option<Vec<MessageObject>>,
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(rename = "type", default)]
    typ: Option<String>,
    #[serde(default)]
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    value: String,
}

#[derive(Debug, Serialize)]
struct SubmitToolOutputsRequest {
    tool_outputs: Vec<ToolOutputItem>,
}

#[derive(Debug, Serialize)]
struct ToolOutputItem {
    tool_call_id: String,
    output: String,
}
