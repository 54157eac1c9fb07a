//! Durable row shapes for the audits domain.
//!
//! Jobs are the only mutable rows (status/progress fields); page audits,
//! issues and summaries are written once by ingestion and never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One crawl request and its lifecycle record.
///
/// Invariants: `score` is non-null only when status is completed; `error`
/// is non-null only when status is failed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub domain: String,
    pub start_url: String,
    pub max_pages: i32,
    pub max_depth: i32,
    pub config: serde_json::Value,
    pub status: String,
    pub pages_found: i32,
    pub pages_done: i32,
    pub score: Option<i32>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One audited page. `audit_json` is the source of truth; the indexed
/// columns are a queryable projection of it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PageAudit {
    pub id: Uuid,
    pub job_id: Uuid,
    pub url: String,
    pub status_code: i32,
    pub title: Option<String>,
    pub title_length: i32,
    pub title_status: String,
    pub meta_desc: Option<String>,
    pub meta_desc_length: i32,
    pub meta_desc_status: String,
    pub h1_count: i32,
    pub has_canonical: bool,
    pub is_indexable: bool,
    pub has_json_ld: bool,
    pub has_viewport: bool,
    pub has_og_tags: bool,
    pub word_count: i32,
    pub images_total: i32,
    pub images_no_alt: i32,
    pub internal_links: i32,
    pub external_links: i32,
    pub mixed_content: bool,
    pub audit_json: serde_json::Value,
}

/// One site-wide finding.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Issue {
    pub id: Uuid,
    pub job_id: Uuid,
    pub issue_type: String,
    pub severity: String,
    pub description: String,
    pub fix: Option<String>,
    pub affected_count: i32,
    pub affected_urls: serde_json::Value,
}

/// At most one per job, written when the job transitions to completed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Summary {
    pub job_id: Uuid,
    pub pages_audited: i32,
    pub score: i32,
    pub issues_critical: i32,
    pub issues_warning: i32,
    pub issues_info: i32,
    pub audit_json: serde_json::Value,
}
