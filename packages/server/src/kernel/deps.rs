//! Server dependencies (using traits for testability)
//!
//! This module provides the central dependency container passed into the
//! orchestrator and both transport adapters. All external services use
//! trait abstractions so components can be exercised with fakes.

use std::sync::Arc;

use sqlx::PgPool;

use super::traits::{BaseCrawlerUnit, BaseSnapshotStore};

/// Server dependencies accessible to the shared business logic
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    /// Per-job compute unit client (the crawl executor boundary)
    pub crawler: Arc<dyn BaseCrawlerUnit>,
    /// Blob store for raw page snapshots (best-effort writes)
    pub snapshots: Arc<dyn BaseSnapshotStore>,
    /// Crawl limits applied when a submission omits them
    pub default_max_pages: i32,
    pub default_max_depth: i32,
}

impl ServerDeps {
    pub fn new(
        db_pool: PgPool,
        crawler: Arc<dyn BaseCrawlerUnit>,
        snapshots: Arc<dyn BaseSnapshotStore>,
        default_max_pages: i32,
        default_max_depth: i32,
    ) -> Self {
        Self {
            db_pool,
            crawler,
            snapshots,
            default_max_pages,
            default_max_depth,
        }
    }
}
