//! Tool definitions and dispatch for the agent protocol.
//!
//! Each tool maps 1:1 onto a shared-logic operation; argument parsing
//! mirrors the REST adapter so both transports validate identically.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::protocol::{self, JsonRpcRequest, JsonRpcResponse};
use crate::common::AppError;
use crate::domains::audits::orchestrator::SubmitAudit;
use crate::domains::audits::query::run_query;
use crate::domains::audits::types::{JobStatus, Severity};
use crate::server::app::AppState;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// Handle one JSON-RPC request. Never panics and never errors out of the
/// transport: every failure becomes a response object.
pub async fn dispatch(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();

    match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "seo-audit-server",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tool_definitions() })),
        "tools/call" => {
            let (name, arguments) = match parse_call_params(request.params) {
                Ok(parsed) => parsed,
                Err(message) => {
                    return JsonRpcResponse::error(id, protocol::INVALID_PARAMS, message)
                }
            };

            match call_tool(state, &name, arguments).await {
                Ok(result) => JsonRpcResponse::success(
                    id,
                    json!({
                        "content": [{
                            "type": "text",
                            "text": serde_json::to_string_pretty(&result)
                                .unwrap_or_else(|_| result.to_string()),
                        }],
                        "isError": false,
                    }),
                ),
                Err(e) => {
                    // Tool failures stay in-band so the agent can read them
                    tracing::warn!(tool = %name, error = %e, "Tool call failed");
                    JsonRpcResponse::success(
                        id,
                        json!({
                            "content": [{ "type": "text", "text": e.to_string() }],
                            "isError": true,
                        }),
                    )
                }
            }
        }
        other => JsonRpcResponse::error(
            id,
            protocol::METHOD_NOT_FOUND,
            format!("unknown method: {other}"),
        ),
    }
}

fn parse_call_params(
    params: Option<serde_json::Value>,
) -> Result<(String, serde_json::Value), String> {
    let params = params.ok_or("params are required for tools/call")?;
    let name = params
        .get("name")
        .and_then(|n| n.as_str())
        .ok_or("tool name is required")?
        .to_string();
    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| json!({}));
    Ok((name, arguments))
}

#[derive(Deserialize)]
struct SubmitArgs {
    url: Option<String>,
    max_pages: Option<i32>,
    max_depth: Option<i32>,
    #[serde(default)]
    config: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct JobIdArgs {
    job_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct ListArgs {
    domain: Option<String>,
    status: Option<String>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct IssuesArgs {
    job_id: Option<Uuid>,
    severity: Option<String>,
}

#[derive(Deserialize)]
struct PagesArgs {
    job_id: Option<Uuid>,
    #[serde(default)]
    problems_only: bool,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Deserialize)]
struct QueryArgs {
    sql: Option<String>,
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(arguments)
        .map_err(|e| AppError::InvalidInput(format!("invalid arguments: {e}")))
}

fn require<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::InvalidInput(format!("{field} is required")))
}

async fn call_tool(
    state: &AppState,
    name: &str,
    arguments: serde_json::Value,
) -> Result<serde_json::Value, AppError> {
    match name {
        "submit_audit" => {
            let args: SubmitArgs = parse_args(arguments)?;
            let job = state
                .orchestrator
                .submit(SubmitAudit {
                    url: require(args.url, "url")?,
                    max_pages: args.max_pages,
                    max_depth: args.max_depth,
                    extra_config: args.config,
                })
                .await?;
            Ok(json!({ "job_id": job.id, "domain": job.domain, "status": job.status }))
        }
        "get_audit_status" => {
            let args: JobIdArgs = parse_args(arguments)?;
            let job = state
                .orchestrator
                .poll(require(args.job_id, "job_id")?)
                .await?;
            Ok(json!({
                "id": job.id,
                "status": job.status,
                "pages_found": job.pages_found,
                "pages_done": job.pages_done,
                "score": job.score,
                "error": job.error,
            }))
        }
        "list_audits" => {
            let args: ListArgs = parse_args(arguments)?;
            let status = args
                .status
                .as_deref()
                .map(JobStatus::from_str)
                .transpose()
                .map_err(AppError::InvalidInput)?;
            let jobs = state
                .orchestrator
                .list(args.domain.as_deref(), status, args.limit)
                .await?;
            Ok(json!({ "jobs": jobs }))
        }
        "get_audit" => {
            let args: JobIdArgs = parse_args(arguments)?;
            let (job, summary) = state
                .orchestrator
                .get(require(args.job_id, "job_id")?)
                .await?;
            Ok(json!({ "job": job, "summary": summary }))
        }
        "get_issues" => {
            let args: IssuesArgs = parse_args(arguments)?;
            let severity = args
                .severity
                .as_deref()
                .map(Severity::from_str)
                .transpose()
                .map_err(AppError::InvalidInput)?;
            let issues = state
                .orchestrator
                .issues(require(args.job_id, "job_id")?, severity)
                .await?;
            Ok(json!({ "issues": issues }))
        }
        "get_pages" => {
            let args: PagesArgs = parse_args(arguments)?;
            let (pages, count) = state
                .orchestrator
                .pages(
                    require(args.job_id, "job_id")?,
                    args.problems_only,
                    args.limit,
                    args.offset,
                )
                .await?;
            Ok(json!({ "pages": pages, "count": count }))
        }
        "run_query" => {
            let args: QueryArgs = parse_args(arguments)?;
            let output = run_query(&state.db_pool, &require(args.sql, "sql")?).await?;
            Ok(serde_json::to_value(output).map_err(anyhow::Error::new)?)
        }
        other => Err(AppError::InvalidInput(format!("unknown tool: {other}"))),
    }
}

fn tool_definitions() -> serde_json::Value {
    json!([
        {
            "name": "submit_audit",
            "description": "Start an SEO audit crawl of a website. Returns a job_id to poll.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "Absolute start URL" },
                    "max_pages": { "type": "number" },
                    "max_depth": { "type": "number" },
                    "config": { "type": "object", "description": "Extra crawl options" }
                },
                "required": ["url"]
            }
        },
        {
            "name": "get_audit_status",
            "description": "Poll a crawl job. Terminal results are ingested before this returns completed.",
            "inputSchema": {
                "type": "object",
                "properties": { "job_id": { "type": "string" } },
                "required": ["job_id"]
            }
        },
        {
            "name": "list_audits",
            "description": "List audit jobs, newest first. Optional domain/status filters.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "domain": { "type": "string" },
                    "status": { "type": "string", "enum": ["queued", "running", "completed", "failed"] },
                    "limit": { "type": "number", "description": "Default 20, max 100" }
                }
            }
        },
        {
            "name": "get_audit",
            "description": "Fetch one audit job with its site summary (null until completed).",
            "inputSchema": {
                "type": "object",
                "properties": { "job_id": { "type": "string" } },
                "required": ["job_id"]
            }
        },
        {
            "name": "get_issues",
            "description": "Site-wide findings for a job, ordered critical, warning, info.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "job_id": { "type": "string" },
                    "severity": { "type": "string", "enum": ["critical", "warning", "info"] }
                },
                "required": ["job_id"]
            }
        },
        {
            "name": "get_pages",
            "description": "Per-page audit rows for a job. problems_only filters to failing pages.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "job_id": { "type": "string" },
                    "problems_only": { "type": "boolean" },
                    "limit": { "type": "number", "description": "Default 50, max 200" },
                    "offset": { "type": "number" }
                },
                "required": ["job_id"]
            }
        },
        {
            "name": "run_query",
            "description": "Run read-only SQL against the audit store. Mutating statements are rejected.",
            "inputSchema": {
                "type": "object",
                "properties": { "sql": { "type": "string" } },
                "required": ["sql"]
            }
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_params_require_a_tool_name() {
        assert!(parse_call_params(Some(json!({ "arguments": {} }))).is_err());
        assert!(parse_call_params(None).is_err());

        let (name, arguments) =
            parse_call_params(Some(json!({ "name": "list_audits" }))).unwrap();
        assert_eq!(name, "list_audits");
        assert_eq!(arguments, json!({}));
    }

    #[test]
    fn tool_definitions_cover_every_operation() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "submit_audit",
                "get_audit_status",
                "list_audits",
                "get_audit",
                "get_issues",
                "get_pages",
                "run_query",
            ]
        );
    }
}
