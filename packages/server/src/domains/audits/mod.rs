//! Audits domain - crawl job orchestration, result ingestion, and the
//! read-only query surface.
//!
//! Both transports (REST and the agent tool protocol) call into this
//! module; neither carries business logic of its own.

pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod query;
pub mod store;
pub mod types;

pub use models::{Issue, Job, PageAudit, Summary};
pub use orchestrator::Orchestrator;
pub use query::{run_query, QueryOutput};
pub use types::{JobStatus, Severity};
