//! Job orchestrator: the crawl-job state machine.
//!
//! Owns every `audit_jobs.status` transition. Both transport adapters
//! call these methods; neither adds behavior of its own.

use std::str::FromStr;

use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use super::ingest::{self, IngestOutcome};
use super::models::{Issue, Job, PageAudit, Summary};
use super::store;
use super::types::{JobStatus, Severity};
use crate::common::AppError;
use crate::kernel::ServerDeps;

pub const LIST_DEFAULT_LIMIT: i64 = 20;
pub const LIST_MAX_LIMIT: i64 = 100;
pub const PAGES_DEFAULT_LIMIT: i64 = 50;
pub const PAGES_MAX_LIMIT: i64 = 200;

/// A crawl submission after argument merging.
#[derive(Debug, Clone, Default)]
pub struct SubmitAudit {
    pub url: String,
    pub max_pages: Option<i32>,
    pub max_depth: Option<i32>,
    /// Opaque extra options; `max_pages`/`max_depth` keys act as
    /// fallbacks when the explicit arguments are omitted.
    pub extra_config: Option<serde_json::Value>,
}

pub struct Orchestrator {
    deps: ServerDeps,
}

impl Orchestrator {
    pub fn new(deps: ServerDeps) -> Self {
        Self { deps }
    }

    pub fn deps(&self) -> &ServerDeps {
        &self.deps
    }

    /// Create a job and hand it to the compute unit.
    ///
    /// A rejected start still leaves a discoverable job row in `failed`;
    /// the returned error carries the job id for that reason.
    pub async fn submit(&self, submit: SubmitAudit) -> Result<Job, AppError> {
        let parsed = Url::parse(&submit.url)
            .map_err(|_| AppError::InvalidInput(format!("invalid url: {}", submit.url)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::InvalidInput(format!(
                "url must be http(s): {}",
                submit.url
            )));
        }

        let domain = parsed
            .host_str()
            .ok_or_else(|| AppError::InvalidInput(format!("url has no host: {}", submit.url)))?
            .to_string();

        let config = submit
            .extra_config
            .clone()
            .unwrap_or_else(|| serde_json::json!({}));
        let max_pages = resolve_limit(
            submit.max_pages,
            &config,
            "max_pages",
            self.deps.default_max_pages,
        );
        let max_depth = resolve_limit(
            submit.max_depth,
            &config,
            "max_depth",
            self.deps.default_max_depth,
        );

        let id = Uuid::new_v4();
        store::insert_job(
            &self.deps.db_pool,
            id,
            &domain,
            &submit.url,
            max_pages,
            max_depth,
            &config,
        )
        .await?;

        info!(job_id = %id, domain = %domain, max_pages, max_depth, "Audit job created");

        match self
            .deps
            .crawler
            .start(id, &submit.url, max_pages, max_depth)
            .await
        {
            Ok(()) => {
                let job = store::mark_running(&self.deps.db_pool, id).await?;
                info!(job_id = %id, "Compute unit accepted crawl");
                Ok(job)
            }
            Err(e) => {
                let message = format!("crawl failed to start: {e}");
                store::mark_failed(&self.deps.db_pool, id, &message).await?;
                warn!(job_id = %id, error = %e, "Compute unit rejected start");
                Err(AppError::UpstreamUnavailable {
                    message,
                    job_id: Some(id),
                })
            }
        }
    }

    /// Return the current status snapshot, reconciling compute-unit
    /// progress into durable state on first terminal observation.
    pub async fn poll(&self, job_id: Uuid) -> Result<Job, AppError> {
        let job = self.require_job(job_id).await?;

        // Terminal state is final; never re-contact the unit.
        if stored_status(&job).is_terminal() {
            return Ok(job);
        }

        let report = match self.deps.crawler.status(job_id).await {
            Ok(report) => report,
            Err(e) => {
                // The unit may simply be cold-starting; transient
                // unreachability never mutates status.
                warn!(job_id = %job_id, error = %e, "Status poll failed, returning stored state");
                return Ok(job);
            }
        };

        match report.status {
            JobStatus::Completed => {
                let Some(results) = &report.results else {
                    warn!(job_id = %job_id, "Unit reported completed without results, treating as in-flight");
                    return Ok(job);
                };

                match ingest::ingest_results(&self.deps, &job, report.pages_found, results)
                    .await?
                {
                    IngestOutcome::Ingested(completed) => Ok(completed),
                    IngestOutcome::AlreadyTerminal => self.require_job(job_id).await,
                }
            }
            JobStatus::Failed => {
                let message = report
                    .error
                    .unwrap_or_else(|| "crawl failed inside compute unit".to_string());
                Ok(store::mark_failed(&self.deps.db_pool, job_id, &message).await?)
            }
            _ => {
                // Progress numbers are display-only until terminal; merging
                // them into the snapshot avoids a write per poll.
                let mut snapshot = job;
                if let Some(found) = report.pages_found {
                    snapshot.pages_found = found;
                }
                if let Some(done) = report.pages_done {
                    snapshot.pages_done = done;
                }
                Ok(snapshot)
            }
        }
    }

    pub async fn list(
        &self,
        domain: Option<&str>,
        status: Option<JobStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<Job>, AppError> {
        let limit = clamp_limit(limit, LIST_DEFAULT_LIMIT, LIST_MAX_LIMIT).max(1);
        Ok(store::list_jobs(&self.deps.db_pool, domain, status, limit).await?)
    }

    pub async fn get(&self, job_id: Uuid) -> Result<(Job, Option<Summary>), AppError> {
        let job = self.require_job(job_id).await?;
        let summary = store::find_summary(&self.deps.db_pool, job_id).await?;
        Ok((job, summary))
    }

    pub async fn issues(
        &self,
        job_id: Uuid,
        severity: Option<Severity>,
    ) -> Result<Vec<Issue>, AppError> {
        self.require_job(job_id).await?;
        Ok(store::list_issues(&self.deps.db_pool, job_id, severity).await?)
    }

    pub async fn pages(
        &self,
        job_id: Uuid,
        problems_only: bool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<(Vec<PageAudit>, i64), AppError> {
        self.require_job(job_id).await?;

        let limit = clamp_limit(limit, PAGES_DEFAULT_LIMIT, PAGES_MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);

        let pages =
            store::list_pages(&self.deps.db_pool, job_id, problems_only, limit, offset).await?;
        let count = store::count_pages(&self.deps.db_pool, job_id, problems_only).await?;

        Ok((pages, count))
    }

    async fn require_job(&self, job_id: Uuid) -> Result<Job, AppError> {
        store::find_job(&self.deps.db_pool, job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("audit job {job_id}")))
    }
}

fn stored_status(job: &Job) -> JobStatus {
    // The CHECK constraint makes unknown statuses unreachable.
    JobStatus::from_str(&job.status).unwrap_or(JobStatus::Failed)
}

/// Explicit argument overrides the extra-config key overrides the default.
fn resolve_limit(
    explicit: Option<i32>,
    config: &serde_json::Value,
    key: &str,
    default: i32,
) -> i32 {
    explicit
        .or_else(|| {
            config
                .get(key)
                .and_then(|v| v.as_i64())
                .map(|v| v as i32)
        })
        .unwrap_or(default)
}

fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(0, max)
}
