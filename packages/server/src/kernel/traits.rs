// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (orchestration, ingestion) lives in domain functions
// that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseCrawlerUnit)

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domains::audits::types::CrawlStatusReport;

// =============================================================================
// Compute-Unit Client Trait (Infrastructure)
// =============================================================================

/// Failure at the compute-unit boundary.
///
/// Unit-unreachable and non-2xx responses are reported uniformly as
/// `Unavailable`; the client never retries internally. Crawls run for
/// minutes, so "poll again later" is the caller's contract.
#[derive(Error, Debug)]
pub enum CrawlerUnitError {
    #[error("Compute unit unavailable: {0}")]
    Unavailable(String),

    #[error("Compute unit returned an unexpected payload: {0}")]
    BadResponse(String),
}

/// Client for the per-job compute unit that performs the actual crawl.
///
/// The same job id must always address the same unit instance for the
/// lifetime of the job.
#[async_trait]
pub trait BaseCrawlerUnit: Send + Sync {
    /// Ask the unit for `job_id` to begin crawling. Any 2xx is acceptance.
    async fn start(
        &self,
        job_id: Uuid,
        url: &str,
        max_pages: i32,
        max_depth: i32,
    ) -> Result<(), CrawlerUnitError>;

    /// Poll crawl progress; terminal reports carry the full result payload.
    async fn status(&self, job_id: Uuid) -> Result<CrawlStatusReport, CrawlerUnitError>;

    /// Liveness check against the unit fleet.
    async fn health(&self) -> Result<(), CrawlerUnitError>;
}

// =============================================================================
// Snapshot Store Trait (Infrastructure)
// =============================================================================

/// Blob store for raw page captures, keyed `job_id/urlencoded(url)`.
/// Write-only from the ingestion path; snapshots are a convenience
/// artifact, not the source of truth.
#[async_trait]
pub trait BaseSnapshotStore: Send + Sync {
    async fn put(&self, key: &str, body: &[u8]) -> Result<()>;
}
