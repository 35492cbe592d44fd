//! End-to-end relay test against stubbed collaborators: a stub assistant
//! service and a stub analysis engine run on free ports, and the gateway is
//! configured to talk to them. Drives start → status (tool dispatch + submit)
//! → status (completed) → process through the real HTTP surface.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use lib::config::Config;
use lib::gateway;
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ANSWER: &str = "Waiting time is dominated by batching.";

/// Records everything the gateway sends to the stub assistant service.
#[derive(Clone, Default)]
struct AssistantStub {
    messages: Arc<Mutex<Vec<String>>>,
    runs_created: Arc<Mutex<Vec<Value>>>,
    submissions: Arc<Mutex<Vec<Value>>>,
}

async fn stub_create_thread(State(_): State<AssistantStub>) -> Json<Value> {
    Json(json!({ "id": "thread_stub" }))
}

async fn stub_create_message(
    State(stub): State<AssistantStub>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let content = body
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    stub.messages.lock().unwrap().push(content);
    Json(json!({ "id": "msg_stub" }))
}

async fn stub_create_run(
    State(stub): State<AssistantStub>,
    Json(body): Json<Value>,
) -> Json<Value> {
    stub.runs_created.lock().unwrap().push(body);
    Json(json!({ "id": "run_stub", "status": "queued" }))
}

/// Blocked on one query_database call until outputs are submitted, then completed.
async fn stub_get_run(
    State(stub): State<AssistantStub>,
    Path((_tid, _rid)): Path<(String, String)>,
) -> Json<Value> {
    if stub.submissions.lock().unwrap().is_empty() {
        Json(json!({
            "id": "run_stub",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_stub_1",
                        "type": "function",
                        "function": {
                            "name": "query_database",
                            "arguments": "{\"query\": \"SELECT * FROM {table_name} LIMIT 1\"}"
                        }
                    }]
                }
            }
        }))
    } else {
        Json(json!({ "id": "run_stub", "status": "completed" }))
    }
}

async fn stub_submit_outputs(
    State(stub): State<AssistantStub>,
    Path((_tid, _rid)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    stub.submissions.lock().unwrap().push(body);
    Json(json!({ "id": "run_stub", "status": "queued" }))
}

async fn stub_list_messages(
    State(_): State<AssistantStub>,
    Path(_tid): Path<String>,
) -> Json<Value> {
    Json(json!({
        "data": [{
            "role": "assistant",
            "content": [{ "type": "text", "text": { "value": ANSWER } }]
        }]
    }))
}

fn assistant_router(stub: AssistantStub) -> Router {
    Router::new()
        .route("/threads", post(stub_create_thread))
        .route("/threads/:tid/messages", post(stub_create_message).get(stub_list_messages))
        .route("/threads/:tid/runs", post(stub_create_run))
        .route("/threads/:tid/runs/:rid", get(stub_get_run))
        .route("/threads/:tid/runs/:rid/submit_tool_outputs", post(stub_submit_outputs))
        .with_state(stub)
}

/// Records the SQL text the gateway asks the stub engine to run.
#[derive(Clone, Default)]
struct EngineStub {
    queries: Arc<Mutex<Vec<(String, String)>>>,
}

async fn stub_query(
    State(stub): State<EngineStub>,
    Path(jobid): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let sql = body
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    stub.queries.lock().unwrap().push((jobid, sql));
    Json(json!([{ "case_id": "c-1", "wt_total": 3600 }]))
}

fn engine_router(stub: EngineStub) -> Router {
    Router::new()
        .route("/query/:jobid", post(stub_query))
        .with_state(stub)
}

async fn serve_on_free_port(app: Router) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let port = listener.local_addr().expect("local_addr").port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    port
}

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

fn temp_config_path(port: u16) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("kronos-chat-relay-test-{}", port));
    std::fs::create_dir_all(&dir).expect("create config dir");
    let config_path = dir.join("config.json");
    std::fs::File::create(&config_path)
        .and_then(|mut f| f.write_all(b"{}"))
        .expect("write config.json");
    config_path
}

async fn wait_until_healthy(client: &reqwest::Client, port: u16) {
    let url = format!("http://127.0.0.1:{}/", port);
    for _ in 0..100 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("gateway did not become healthy at {}", url);
}

#[tokio::test]
async fn start_dispatch_and_complete_through_the_http_surface() {
    let assistant_stub = AssistantStub::default();
    let engine_stub = EngineStub::default();
    let assistant_port = serve_on_free_port(assistant_router(assistant_stub.clone())).await;
    let engine_port = serve_on_free_port(engine_router(engine_stub.clone())).await;

    let gateway_port = free_port();
    let config_path = temp_config_path(gateway_port);
    let mut config = Config::default();
    config.gateway.port = gateway_port;
    config.assistant.api_key = Some("test-key".to_string());
    config.assistant.assistant_id = Some("asst_test".to_string());
    config.assistant.base_url = Some(format!("http://127.0.0.1:{}", assistant_port));
    config.engine.base_url = Some(format!("http://127.0.0.1:{}", engine_port));

    tokio::spawn(async move {
        let _ = gateway::run_gateway(config, config_path).await;
    });

    let client = reqwest::Client::new();
    wait_until_healthy(&client, gateway_port).await;
    let base = format!("http://127.0.0.1:{}", gateway_port);

    // Missing required field is rejected with the {error} shape.
    let resp = client
        .post(format!("{}/start", base))
        .json(&json!({ "jobId": "42", "instructions": "analyze" }))
        .send()
        .await
        .expect("start without message");
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("error json");
    assert_eq!(body["error"], json!("message is required"));

    // Start a conversation; the run must carry the forced tools.
    let resp = client
        .post(format!("{}/start", base))
        .json(&json!({
            "jobId": "42",
            "message": "where does the waiting time come from?",
            "instructions": "you are a waiting-time analyst",
            "functionStatus": { "discover_batching_strategies": false }
        }))
        .send()
        .await
        .expect("start");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("start json");
    assert_eq!(body["threadId"], json!("thread_stub"));
    assert_eq!(body["runId"], json!("run_stub"));

    {
        let runs = assistant_stub.runs_created.lock().unwrap();
        let tools: Vec<&str> = runs[0]["tools"]
            .as_array()
            .expect("tools array")
            .iter()
            .filter_map(|t| t["function"]["name"].as_str())
            .collect();
        assert!(tools.contains(&"query_database"));
        assert!(tools.contains(&"discover_resourse_calendars"));
        assert!(!tools.contains(&"discover_batching_strategies"));
        assert_eq!(runs[0]["instructions"], json!("you are a waiting-time analyst"));
    }

    // First poll: the stub run requires a query_database call; the gateway
    // dispatches it to the engine and submits the output.
    let resp = client
        .get(format!("{}/status/42/thread_stub/run_stub", base))
        .send()
        .await
        .expect("first status");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("status json");
    assert_eq!(body["status"], json!("queued"));
    assert_eq!(body["functionName"], json!("query_database"));
    assert_eq!(body["functionResults"].as_array().map(|a| a.len()), Some(1));
    assert!(body["functionResult"]
        .as_str()
        .unwrap_or_default()
        .contains("case_id"));

    {
        let queries = engine_stub.queries.lock().unwrap();
        assert_eq!(
            queries.as_slice(),
            [("42".to_string(), "SELECT * FROM job_42 LIMIT 1".to_string())]
        );
        let submissions = assistant_stub.submissions.lock().unwrap();
        let outputs = submissions[0]["tool_outputs"].as_array().expect("outputs");
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0]["tool_call_id"], json!("call_stub_1"));
    }

    // Second poll: the stub run is now completed.
    let resp = client
        .get(format!("{}/status/42/thread_stub/run_stub", base))
        .send()
        .await
        .expect("second status");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("status json");
    assert_eq!(body["status"], json!("completed"));
    assert_eq!(body["message"], json!(ANSWER));

    // Continue: the follow-up message carries the duration-format notice.
    let resp = client
        .post(format!("{}/process", base))
        .json(&json!({
            "threadId": "thread_stub",
            "jobId": "42",
            "message": "break it down per resource",
            "instructions": "you are a waiting-time analyst"
        }))
        .send()
        .await
        .expect("process");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("process json");
    assert_eq!(body["threadId"], json!("thread_stub"));
    assert_eq!(body["runId"], json!("run_stub"));

    {
        let messages = assistant_stub.messages.lock().unwrap();
        let follow_up = messages.last().expect("follow-up recorded");
        assert!(follow_up.starts_with("break it down per resource"));
        assert!(follow_up.contains("years, months, days, hours, minutes"));
    }
}
