//! Integration tests for the agent tool protocol.
//!
//! These drive `dispatch` directly (the HTTP and SSE layers only carry
//! bytes); Postgres is real and the compute unit is scripted.

mod common;

use std::sync::Arc;

use common::TestHarness;
use serde_json::json;
use test_context::test_context;

use audit_core::domains::audits::types::{CrawlResults, CrawlStatusReport, JobStatus};
use audit_core::kernel::{MemorySnapshotStore, MockCrawlerUnit, ServerDeps};
use audit_core::server::mcp::{tools, JsonRpcRequest, JsonRpcResponse, McpSessions};
use audit_core::server::AppState;

fn app_state(ctx: &TestHarness, crawler: Arc<MockCrawlerUnit>) -> AppState {
    let snapshots = Arc::new(MemorySnapshotStore::new());
    let deps = ServerDeps::new(ctx.db_pool.clone(), crawler, snapshots, 50, 3);
    AppState {
        db_pool: ctx.db_pool.clone(),
        orchestrator: Arc::new(audit_core::domains::audits::Orchestrator::new(deps)),
        api_token: "test-token".to_string(),
        mcp_sessions: McpSessions::new(),
    }
}

fn request(method: &str, params: serde_json::Value) -> JsonRpcRequest {
    serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    }))
    .expect("valid request")
}

/// Unwrap the text content of a tools/call response into JSON.
fn tool_output(response: &JsonRpcResponse) -> (serde_json::Value, bool) {
    let result = response.result.as_ref().expect("tool calls always succeed at the transport level");
    let is_error = result["isError"].as_bool().unwrap_or(false);
    let text = result["content"][0]["text"].as_str().expect("text content");
    let parsed = serde_json::from_str(text).unwrap_or_else(|_| json!(text));
    (parsed, is_error)
}

#[test_context(TestHarness)]
#[tokio::test]
async fn initialize_and_tools_list(ctx: &TestHarness) {
    let state = app_state(ctx, Arc::new(MockCrawlerUnit::new()));

    let response = tools::dispatch(&state, request("initialize", json!({}))).await;
    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], json!("2024-11-05"));
    assert_eq!(result["serverInfo"]["name"], json!("seo-audit-server"));

    let response = tools::dispatch(&state, request("tools/list", json!({}))).await;
    let tools_array = response.result.unwrap()["tools"].clone();
    assert_eq!(tools_array.as_array().unwrap().len(), 7);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn unknown_method_is_a_protocol_error(ctx: &TestHarness) {
    let state = app_state(ctx, Arc::new(MockCrawlerUnit::new()));

    let response = tools::dispatch(&state, request("resources/list", json!({}))).await;
    let error = response.error.expect("unknown methods error out-of-band");
    assert_eq!(error.code, -32601);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn submit_then_poll_through_tools(ctx: &TestHarness) {
    let crawler = Arc::new(MockCrawlerUnit::new().with_status_report(CrawlStatusReport {
        status: JobStatus::Completed,
        pages_found: Some(0),
        pages_done: Some(0),
        error: None,
        results: Some(CrawlResults::default()),
    }));
    let state = app_state(ctx, crawler);

    let response = tools::dispatch(
        &state,
        request(
            "tools/call",
            json!({
                "name": "submit_audit",
                "arguments": { "url": "https://tools.example.com" },
            }),
        ),
    )
    .await;
    let (submitted, is_error) = tool_output(&response);
    assert!(!is_error);
    assert_eq!(submitted["status"], json!("running"));
    let job_id = submitted["job_id"].as_str().unwrap().to_string();

    let response = tools::dispatch(
        &state,
        request(
            "tools/call",
            json!({ "name": "get_audit_status", "arguments": { "job_id": job_id } }),
        ),
    )
    .await;
    let (status, is_error) = tool_output(&response);
    assert!(!is_error);
    assert_eq!(status["status"], json!("completed"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn tool_failures_stay_in_band(ctx: &TestHarness) {
    let state = app_state(ctx, Arc::new(MockCrawlerUnit::new()));

    // Validation failure: bad URL
    let response = tools::dispatch(
        &state,
        request(
            "tools/call",
            json!({ "name": "submit_audit", "arguments": { "url": "not a url" } }),
        ),
    )
    .await;
    assert!(response.error.is_none(), "tool failures are not protocol errors");
    let (_, is_error) = tool_output(&response);
    assert!(is_error);

    // Guard rejection: mutation through run_query
    let response = tools::dispatch(
        &state,
        request(
            "tools/call",
            json!({ "name": "run_query", "arguments": { "sql": "DELETE FROM audit_jobs" } }),
        ),
    )
    .await;
    let (message, is_error) = tool_output(&response);
    assert!(is_error);
    assert!(message.as_str().unwrap().contains("not allowed"));

    // Unknown tool
    let response = tools::dispatch(
        &state,
        request("tools/call", json!({ "name": "drop_database", "arguments": {} })),
    )
    .await;
    let (_, is_error) = tool_output(&response);
    assert!(is_error);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn run_query_tool_returns_rows(ctx: &TestHarness) {
    let state = app_state(ctx, Arc::new(MockCrawlerUnit::new()));

    let response = tools::dispatch(
        &state,
        request(
            "tools/call",
            json!({ "name": "run_query", "arguments": { "sql": "SELECT 1 AS one" } }),
        ),
    )
    .await;
    let (output, is_error) = tool_output(&response);
    assert!(!is_error);
    assert_eq!(output["count"], json!(1));
    assert_eq!(output["rows"][0]["one"], json!(1));
    assert_eq!(output["columns"], json!(["one"]));
}
