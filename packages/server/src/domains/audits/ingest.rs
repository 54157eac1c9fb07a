//! Ingestion pipeline: translate a terminal compute-unit payload into
//! durable rows and flip the job to completed.
//!
//! The claim, both batch inserts and the summary row run inside one
//! transaction, so a job is either fully ingested or untouched
//! (all-or-nothing per job). Snapshot writes sit outside the transaction
//! and are best-effort.

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::models::Job;
use super::store;
use super::types::CrawlResults;
use crate::kernel::ServerDeps;

/// Outcome of an ingestion attempt.
pub enum IngestOutcome {
    /// This caller won the claim and ingested the payload.
    Ingested(Job),
    /// The job was already terminal; nothing was written.
    AlreadyTerminal,
}

/// Ingest a terminal result payload for `job`.
///
/// Invoked by the orchestrator on first terminal observation. A concurrent
/// poller racing to the same observation loses the conditional claim and
/// writes nothing, so page/issue rows are never duplicated.
pub async fn ingest_results(
    deps: &ServerDeps,
    job: &Job,
    pages_found: Option<i32>,
    results: &CrawlResults,
) -> Result<IngestOutcome> {
    let pages_done = results.pages.len() as i32;
    let pages_found = pages_found.unwrap_or(pages_done);
    let score = results.summary.as_ref().map(|s| s.score);

    let mut tx = deps
        .db_pool
        .begin()
        .await
        .context("Failed to begin ingestion transaction")?;

    let claimed =
        store::claim_completion(&mut tx, job.id, pages_found, pages_done, score).await?;

    let Some(completed) = claimed else {
        // Another poller got here first; the stored row is authoritative.
        return Ok(IngestOutcome::AlreadyTerminal);
    };

    store::insert_page_audits(&mut tx, job.id, &results.pages).await?;
    store::insert_issues(&mut tx, job.id, &results.issues).await?;
    if let Some(summary) = &results.summary {
        store::insert_summary(&mut tx, job.id, summary).await?;
    }

    tx.commit()
        .await
        .context("Failed to commit ingestion transaction")?;

    info!(
        job_id = %job.id,
        pages = results.pages.len(),
        issues = results.issues.len(),
        score = ?score,
        "Ingested crawl results"
    );

    // Snapshots are a convenience artifact; a failed put never unwinds the
    // structured rows committed above.
    for snapshot in &results.snapshots {
        let key = format!("{}/{}", job.id, urlencoding::encode(&snapshot.url));
        if let Err(e) = deps.snapshots.put(&key, snapshot.html.as_bytes()).await {
            warn!(job_id = %job.id, key = %key, error = %e, "Snapshot write failed");
        }
    }

    Ok(IngestOutcome::Ingested(completed))
}
