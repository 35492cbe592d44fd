//! Gateway HTTP server.

use crate::assistant::AssistantClient;
use crate::config::{self, Config};
use crate::engine::{AnalysisEngine, EngineClient};
use crate::gateway::protocol::{
    FunctionResult, ProcessRequest, StartRequest, StartResponse, StatusResponse,
};
use crate::patterns::PatternBook;
use crate::relay::{self, PollOutcome, RelayError, StartOptions};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state for the gateway (config, clients, reference data).
/// All fields are immutable after startup; concurrent requests share them.
#[derive(Clone)]
struct GatewayState {
    config: Arc<Config>,
    assistant: AssistantClient,
    engine: Arc<dyn AnalysisEngine>,
    patterns: Arc<PatternBook>,
}

/// Error surfaced to HTTP callers as `{"error": message}` with a non-2xx status.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<crate::assistant::AssistantError> for ApiError {
    fn from(e: crate::assistant::AssistantError) -> Self {
        ApiError::bad_gateway(e.to_string())
    }
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::Assistant(e) => ApiError::bad_gateway(e.to_string()),
            RelayError::Engine(e) => ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: e.to_string(),
            },
        }
    }
}

fn require(value: &str, name: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::bad_request(format!("{} is required", name)))
    } else {
        Ok(())
    }
}

/// Model for a run: request override first, then the configured default.
/// None lets the remote assistant use its own configured model.
fn resolve_model(config: &Config, param: Option<&str>) -> Option<String> {
    param
        .or(config.assistant.default_model.as_deref())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Requires the assistant API key and assistant id to be configured.
/// Blocks until shutdown (e.g. Ctrl+C).
/// `config_path` is the path to the config file (used to resolve the pattern file).
pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    let api_key = config::resolve_api_key(&config).ok_or_else(|| {
        anyhow::anyhow!("assistant api key not configured (set assistant.apiKey or OPENAI_API_KEY)")
    })?;
    let assistant_id = config::resolve_assistant_id(&config).ok_or_else(|| {
        anyhow::anyhow!(
            "assistant id not configured (set assistant.assistantId or KRONOS_ASSISTANT_ID)"
        )
    })?;

    let bind = config.gateway.bind.trim().to_string();
    if !config::is_loopback_bind(&bind) {
        log::warn!(
            "gateway binding to {} — this service has no auth layer; front it with one",
            bind
        );
    }

    let patterns_path = config::resolve_patterns_path(&config, &config_path);
    let patterns = PatternBook::load(patterns_path.as_deref())?;
    log::info!("loaded {} redesign pattern(s)", patterns.len());

    let assistant = AssistantClient::new(
        api_key,
        assistant_id,
        config.assistant.base_url.clone(),
    );
    let engine = EngineClient::new(config.engine.base_url.clone());

    let state = GatewayState {
        config: Arc::new(config.clone()),
        assistant,
        engine: Arc::new(engine),
        patterns: Arc::new(patterns),
    };

    let app = Router::new()
        .route("/", get(health_http))
        .route("/start", post(start_http))
        .route("/process", post(process_http))
        .route("/status/:jobid/:threadid/:runid", get(status_http))
        .with_state(state);

    let bind_addr = format!("{}:{}", bind, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "service": "kronos-chat",
        "port": state.config.gateway.port,
    }))
}

/// POST /start — open a new conversation for a job and submit the first turn.
async fn start_http(
    State(state): State<GatewayState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    require(&req.job_id, "jobId")?;
    require(&req.message, "message")?;
    require(&req.instructions, "instructions")?;

    let model = resolve_model(&state.config, req.model.as_deref());
    let (thread_id, run_id) = relay::start_conversation(
        &state.assistant,
        StartOptions {
            job_id: req.job_id,
            message: req.message,
            instructions: req.instructions,
            additional_instructions: req.assistant_instructions,
            model,
            enabled_tools: req.function_status,
            tool_descriptions: req.function_descriptions,
        },
    )
    .await?;
    Ok(Json(StartResponse { thread_id, run_id }))
}

/// POST /process — append a follow-up message and submit a new turn.
async fn process_http(
    State(state): State<GatewayState>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    require(&req.thread_id, "threadId")?;
    require(&req.job_id, "jobId")?;
    require(&req.message, "message")?;
    require(&req.instructions, "instructions")?;

    let model = resolve_model(&state.config, None);
    let run_id = relay::continue_conversation(
        &state.assistant,
        &req.thread_id,
        &req.job_id,
        &req.message,
        &req.instructions,
        model,
    )
    .await?;
    Ok(Json(StartResponse {
        thread_id: req.thread_id,
        run_id,
    }))
}

/// GET /status/:jobid/:threadid/:runid — poll a run, dispatching tool calls on demand.
async fn status_http(
    State(state): State<GatewayState>,
    Path((job_id, thread_id, run_id)): Path<(String, String, String)>,
) -> Result<Json<StatusResponse>, ApiError> {
    let outcome = relay::poll_turn(
        &state.assistant,
        state.engine.as_ref(),
        &state.patterns,
        &job_id,
        &thread_id,
        &run_id,
    )
    .await?;

    match outcome {
        PollOutcome::Completed { message } => Ok(Json(StatusResponse::plain("completed", message))),
        PollOutcome::Failed => Err(ApiError::bad_gateway(
            "the assistant service marked the run as failed",
        )),
        PollOutcome::Resumed { status, calls } => {
            let mut response = StatusResponse::plain(status, "");
            if let Some(last) = calls.last() {
                response.function_name = Some(last.name.clone());
                response.function_arguments = Some(last.arguments.clone());
                response.function_result = Some(last.output.clone());
            }
            response.function_results = Some(
                calls
                    .into_iter()
                    .map(|c| FunctionResult {
                        name: c.name,
                        arguments: c.arguments,
                        result: c.output,
                    })
                    .collect(),
            );
            Ok(Json(response))
        }
        PollOutcome::Pending { status } => Ok(Json(StatusResponse::plain(status, ""))),
    }
}
