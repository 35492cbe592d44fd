//! Conversation relay: start/continue a job conversation with the remote
//! assistant, and poll a run — dispatching tool invocations to the analysis
//! engine and the pattern book when the run asks for external data.
//!
//! Every invocation in a batch gets exactly one output (error payloads
//! included), so a blocked run can always resume; only an engine failure
//! aborts a poll.

use crate::assistant::{AssistantBackend, AssistantError, RunSpec, ToolInvocation, ToolOutput};
use crate::catalog;
use crate::engine::{sanitize_table_name, AnalysisEngine, EngineError};
use crate::patterns::PatternBook;
use serde_json::json;
use std::collections::HashMap;

/// Appended to every Continue message so follow-up answers keep durations readable.
const DURATION_FORMAT_NOTICE: &str = "\n\nWhen presenting durations, use human-readable \
units (years, months, days, hours, minutes) instead of raw seconds.";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Assistant(#[from] AssistantError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Inputs for starting a new job conversation.
#[derive(Debug, Clone)]
pub struct StartOptions {
    pub job_id: String,
    pub message: String,
    pub instructions: String,
    /// Extra run-scoped instructions, appended by the service after `instructions`.
    pub additional_instructions: Option<String>,
    pub model: Option<String>,
    /// Tool name -> enabled. Absent map or entry means enabled. The SQL query
    /// tool and the resource-calendar tool are offered regardless.
    pub enabled_tools: Option<HashMap<String, bool>>,
    /// Tool name -> description override for this conversation.
    pub tool_descriptions: Option<HashMap<String, String>>,
}

/// Outcome of polling a run once.
#[derive(Debug)]
pub enum PollOutcome {
    /// The run finished; `message` is the latest assistant message text.
    Completed { message: String },
    /// The remote service marked the run failed. Terminal; polling again
    /// re-reports the same outcome.
    Failed,
    /// The run asked for tool results; they were dispatched and submitted.
    /// `status` is the run's status after submission, `calls` summarizes
    /// every invocation in the batch, in order.
    Resumed { status: String, calls: Vec<CallSummary> },
    /// Still processing; poll again later.
    Pending { status: String },
}

/// What one dispatched invocation looked like, for caller visibility.
#[derive(Debug, Clone)]
pub struct CallSummary {
    pub name: String,
    pub arguments: String,
    pub output: String,
}

/// Open a new thread for a job, append the first user message, and submit a
/// run with the selected tool set. Returns (thread id, run id).
pub async fn start_conversation<A: AssistantBackend + ?Sized>(
    assistant: &A,
    opts: StartOptions,
) -> Result<(String, String), AssistantError> {
    let tools = catalog::select_tools(
        opts.enabled_tools.as_ref(),
        opts.tool_descriptions.as_ref(),
    );
    let thread_id = assistant.create_thread().await?;
    log::info!("job {}: created thread {}", opts.job_id, thread_id);
    assistant.add_user_message(&thread_id, &opts.message).await?;
    let run_id = assistant
        .create_run(
            &thread_id,
            RunSpec {
                instructions: opts.instructions,
                additional_instructions: opts.additional_instructions,
                model: opts.model,
                tools,
            },
        )
        .await?;
    log::info!("job {}: created run {} in thread {}", opts.job_id, run_id, thread_id);
    Ok((thread_id, run_id))
}

/// Append a follow-up user message to an existing thread and submit a new run.
/// The duration-format notice is appended to the message; the run carries the
/// full tool catalog. Returns the run id.
pub async fn continue_conversation<A: AssistantBackend + ?Sized>(
    assistant: &A,
    thread_id: &str,
    job_id: &str,
    message: &str,
    instructions: &str,
    model: Option<String>,
) -> Result<String, AssistantError> {
    let content = format!("{}{}", message, DURATION_FORMAT_NOTICE);
    assistant.add_user_message(thread_id, &content).await?;
    let run_id = assistant
        .create_run(
            thread_id,
            RunSpec {
                instructions: instructions.to_string(),
                additional_instructions: None,
                model,
                tools: catalog::select_tools(None, None),
            },
        )
        .await?;
    log::info!("job {}: created run {} in existing thread {}", job_id, run_id, thread_id);
    Ok(run_id)
}

/// Poll a run once. On `requires_action`, dispatches every pending invocation,
/// submits the batch of outputs, and reports the run's new status.
pub async fn poll_turn<A: AssistantBackend + ?Sized>(
    assistant: &A,
    engine: &dyn AnalysisEngine,
    patterns: &PatternBook,
    job_id: &str,
    thread_id: &str,
    run_id: &str,
) -> Result<PollOutcome, RelayError> {
    let run = assistant.run_state(thread_id, run_id).await?;
    log::info!("job {}: run {} status {}", job_id, run_id, run.status);
    match run.status.as_str() {
        "completed" => {
            let message = assistant.latest_assistant_message(thread_id).await?;
            let message = match message {
                Some(text) => text,
                None => {
                    log::warn!(
                        "thread {}: run {} completed but latest assistant message is empty",
                        thread_id,
                        run_id
                    );
                    String::new()
                }
            };
            Ok(PollOutcome::Completed { message })
        }
        "failed" => Ok(PollOutcome::Failed),
        "requires_action" => {
            let mut outputs = Vec::with_capacity(run.pending_calls.len());
            let mut calls = Vec::with_capacity(run.pending_calls.len());
            for invocation in &run.pending_calls {
                let output = dispatch_invocation(engine, patterns, job_id, invocation).await?;
                outputs.push(ToolOutput {
                    tool_call_id: invocation.id.clone(),
                    output: output.clone(),
                });
                calls.push(CallSummary {
                    name: invocation.name.clone(),
                    arguments: invocation.arguments.clone(),
                    output,
                });
            }
            if outputs.is_empty() {
                // Nothing to submit; report the raw state and let the caller retry.
                return Ok(PollOutcome::Pending { status: run.status });
            }
            let resumed = assistant.submit_tool_outputs(thread_id, run_id, outputs).await?;
            Ok(PollOutcome::Resumed {
                status: resumed.status,
                calls,
            })
        }
        _ => Ok(PollOutcome::Pending { status: run.status }),
    }
}

fn error_payload(message: impl Into<String>) -> String {
    json!({ "error": message.into() }).to_string()
}

fn to_payload(value: &serde_json::Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Route one invocation to its handler. A malformed argument bag or an unknown
/// tool name yields an error payload (the invocation is answered either way);
/// an engine failure aborts the whole poll.
async fn dispatch_invocation(
    engine: &dyn AnalysisEngine,
    patterns: &PatternBook,
    job_id: &str,
    invocation: &ToolInvocation,
) -> Result<String, EngineError> {
    let args: serde_json::Value = match serde_json::from_str(&invocation.arguments) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("tool {}: unparsable arguments: {}", invocation.name, e);
            return Ok(error_payload(format!("invalid tool arguments: {}", e)));
        }
    };
    match invocation.name.as_str() {
        catalog::QUERY_DATABASE => {
            let Some(query) = args.get("query").and_then(|v| v.as_str()) else {
                return Ok(error_payload("query_database requires a string 'query' argument"));
            };
            let sql = query.replace("{table_name}", &sanitize_table_name(job_id));
            log::debug!("job {}: executing query: {}", job_id, sql);
            let rows = engine.execute_query(job_id, &sql).await?;
            Ok(to_payload(&rows))
        }
        catalog::DISCOVER_BATCHING_STRATEGIES => {
            let result = engine.discover_batching_strategies(job_id).await?;
            Ok(to_payload(&result))
        }
        catalog::DISCOVER_PRIORITIZATION_STRATEGIES => {
            let result = engine.discover_prioritization_strategies(job_id).await?;
            Ok(to_payload(&result))
        }
        catalog::DISCOVER_CASE_ATTRIBUTES => {
            let result = engine.discover_case_attributes(job_id).await?;
            Ok(to_payload(&result))
        }
        catalog::DISCOVER_RESOURCE_CALENDARS => {
            let result = engine.discover_resource_calendars(job_id).await?;
            Ok(to_payload(&result))
        }
        catalog::GET_REDESIGN_PATTERN_INFO => {
            let Some(values) = args.get("pattern_names").and_then(|v| v.as_array()) else {
                return Ok(error_payload(
                    "get_redesign_pattern_info requires a 'pattern_names' array argument",
                ));
            };
            let mut names = Vec::with_capacity(values.len());
            for v in values {
                match v.as_str() {
                    Some(s) => names.push(s.to_string()),
                    None => {
                        return Ok(error_payload("pattern_names entries must be strings"));
                    }
                }
            }
            match patterns.lookup(&names) {
                Ok(entries) => Ok(to_payload(&json!({ "patterns": entries }))),
                Err(missing) => Ok(to_payload(&json!({
                    "error": format!(
                        "unknown redesign patterns: {}",
                        missing.missing.join(", ")
                    ),
                    "missing_patterns": missing.missing,
                    "valid_patterns": missing.valid_names,
                }))),
            }
        }
        other => {
            log::warn!("run asked for unknown tool: {}", other);
            Ok(error_payload(format!("unknown tool: {}", other)))
        }
    }
}
