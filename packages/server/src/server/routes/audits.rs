//! REST adapter for the audits domain.
//!
//! Handlers parse caller input into the orchestrator's typed arguments,
//! invoke the shared logic, and render JSON. Validation and authorization
//! live elsewhere (shared logic and middleware); nothing here may add
//! behavior the agent tool protocol would not also get.

use std::str::FromStr;

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::common::AppError;
use crate::domains::audits::orchestrator::SubmitAudit;
use crate::domains::audits::types::{JobStatus, Severity};
use crate::server::app::AppState;

#[derive(Deserialize)]
pub struct SubmitBody {
    pub url: Option<String>,
    pub max_pages: Option<i32>,
    pub max_depth: Option<i32>,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

/// POST /api/audits
pub async fn submit_handler(
    Extension(state): Extension<AppState>,
    Json(body): Json<SubmitBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let url = body
        .url
        .ok_or_else(|| AppError::InvalidInput("url is required".to_string()))?;

    let job = state
        .orchestrator
        .submit(SubmitAudit {
            url,
            max_pages: body.max_pages,
            max_depth: body.max_depth,
            extra_config: body.config,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "job_id": job.id,
            "domain": job.domain,
            "status": job.status,
        })),
    ))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub domain: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/audits
pub async fn list_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(JobStatus::from_str)
        .transpose()
        .map_err(AppError::InvalidInput)?;

    let jobs = state
        .orchestrator
        .list(params.domain.as_deref(), status, params.limit)
        .await?;

    Ok(Json(json!({ "jobs": jobs })))
}

/// GET /api/audits/{job_id}
pub async fn get_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (job, summary) = state.orchestrator.get(job_id).await?;
    Ok(Json(json!({ "job": job, "summary": summary })))
}

/// GET /api/audits/{job_id}/poll
pub async fn poll_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let job = state.orchestrator.poll(job_id).await?;
    Ok(Json(json!({
        "id": job.id,
        "status": job.status,
        "pages_found": job.pages_found,
        "pages_done": job.pages_done,
        "score": job.score,
        "error": job.error,
    })))
}

#[derive(Deserialize)]
pub struct IssuesQuery {
    pub severity: Option<String>,
}

/// GET /api/audits/{job_id}/issues
pub async fn issues_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<IssuesQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let severity = params
        .severity
        .as_deref()
        .map(Severity::from_str)
        .transpose()
        .map_err(AppError::InvalidInput)?;

    let issues = state.orchestrator.issues(job_id, severity).await?;
    Ok(Json(json!({ "issues": issues })))
}

#[derive(Deserialize)]
pub struct PagesQuery {
    #[serde(default)]
    pub problems_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/audits/{job_id}/pages
pub async fn pages_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<PagesQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (pages, count) = state
        .orchestrator
        .pages(job_id, params.problems_only, params.limit, params.offset)
        .await?;

    Ok(Json(json!({ "pages": pages, "count": count })))
}
