//! Remote assistant service seam: threads, runs, messages, tool outputs.
//!
//! All conversation state lives in the remote service; this module only moves
//! identifiers and payloads across the wire. [`AssistantClient`] talks to a
//! hosted Assistants API; the trait lets the relay core run against scripted
//! fakes in tests.

mod openai;

pub use openai::AssistantClient;

use crate::catalog::ToolDefinition;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("assistant api error: {0}")]
    Api(String),
}

/// Everything submitted with one run: instructions are required, the rest optional.
/// Tools are scoped to the run itself, never written into shared assistant state.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub instructions: String,
    pub additional_instructions: Option<String>,
    pub model: Option<String>,
    pub tools: Vec<ToolDefinition>,
}

/// A run's status plus any tool invocations it is blocked on.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Remote-managed status string ("queued", "in_progress", "completed",
    /// "failed", "requires_action", ...).
    pub status: String,
    /// Non-empty only when status is "requires_action".
    pub pending_calls: Vec<ToolInvocation>,
}

/// One tool invocation surfaced by a blocked run. `arguments` is the raw
/// JSON-encoded string as sent by the service; `id` must be echoed back.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// One tool result to submit back: the invocation id and a string payload.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// Calls against the remote assistant service used by the relay.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Create a new conversation thread; returns its id.
    async fn create_thread(&self) -> Result<String, AssistantError>;

    /// Append a user message to a thread.
    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<(), AssistantError>;

    /// Submit a thread for processing; returns the run id.
    async fn create_run(&self, thread_id: &str, spec: RunSpec) -> Result<String, AssistantError>;

    /// Current state of a run (status + pending tool invocations).
    async fn run_state(&self, thread_id: &str, run_id: &str) -> Result<RunState, AssistantError>;

    /// Text of the most recent assistant message in the thread, if any.
    async fn latest_assistant_message(&self, thread_id: &str) -> Result<Option<String>, AssistantError>;

    /// Submit the batch of tool outputs for a blocked run; returns the run's new state.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<RunState, AssistantError>;
}
