//! Audits domain data types
//!
//! Job lifecycle enums plus the wire shapes exchanged with the compute
//! unit. The unit's result payload is tolerant of missing sections: any
//! of pages/issues/summary/snapshots may be absent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Crawl job lifecycle state.
///
/// queued → running → {completed | failed}; queued → failed when the
/// start call itself is rejected. Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Issue priority tier: critical > warning > info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Severity::Critical),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

// =============================================================================
// Compute-unit wire shapes
// =============================================================================

/// Status report returned by a compute unit's `GET .../status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStatusReport {
    pub status: JobStatus,
    #[serde(default)]
    pub pages_found: Option<i32>,
    #[serde(default)]
    pub pages_done: Option<i32>,
    #[serde(default)]
    pub error: Option<String>,
    /// Present only when status is completed
    #[serde(default)]
    pub results: Option<CrawlResults>,
}

/// Terminal crawl result payload. Every section is optional; absence is
/// not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResults {
    #[serde(default)]
    pub pages: Vec<PageRecord>,
    #[serde(default)]
    pub issues: Vec<IssueRecord>,
    #[serde(default)]
    pub summary: Option<SummaryRecord>,
    #[serde(default)]
    pub snapshots: Vec<SnapshotRecord>,
}

/// One audited page as produced by the evaluation function. The indexed
/// columns below are a projection; `audit_json` preserves everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    #[serde(default)]
    pub status_code: i32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_length: i32,
    #[serde(default = "default_check_status")]
    pub title_status: String,
    #[serde(default)]
    pub meta_desc: Option<String>,
    #[serde(default)]
    pub meta_desc_length: i32,
    #[serde(default = "default_check_status")]
    pub meta_desc_status: String,
    #[serde(default)]
    pub h1_count: i32,
    #[serde(default)]
    pub has_canonical: bool,
    #[serde(default = "default_true")]
    pub is_indexable: bool,
    #[serde(default)]
    pub has_json_ld: bool,
    #[serde(default)]
    pub has_viewport: bool,
    #[serde(default)]
    pub has_og_tags: bool,
    #[serde(default)]
    pub word_count: i32,
    #[serde(default)]
    pub images_total: i32,
    #[serde(default)]
    pub images_no_alt: i32,
    #[serde(default)]
    pub internal_links: i32,
    #[serde(default)]
    pub external_links: i32,
    #[serde(default)]
    pub mixed_content: bool,
    #[serde(default)]
    pub audit_json: serde_json::Value,
}

fn default_check_status() -> String {
    "fail".to_string()
}

fn default_true() -> bool {
    true
}

/// One site-wide finding. `affected_urls` may be shorter than
/// `affected_count`; callers must not equate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    pub issue_type: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub fix: Option<String>,
    #[serde(default)]
    pub affected_count: i32,
    #[serde(default)]
    pub affected_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    #[serde(default)]
    pub pages_audited: i32,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub issues_critical: i32,
    #[serde(default)]
    pub issues_warning: i32,
    #[serde(default)]
    pub issues_info: i32,
    #[serde(default)]
    pub audit_json: serde_json::Value,
}

/// Raw page capture destined for the snapshot store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub url: String,
    pub html: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("paused".parse::<JobStatus>().is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn crawl_results_tolerates_missing_sections() {
        let report: CrawlStatusReport =
            serde_json::from_str(r#"{"status":"completed","results":{}}"#).unwrap();
        let results = report.results.unwrap();
        assert!(results.pages.is_empty());
        assert!(results.issues.is_empty());
        assert!(results.summary.is_none());
        assert!(results.snapshots.is_empty());
    }

    #[test]
    fn page_record_fills_defaults() {
        let page: PageRecord =
            serde_json::from_str(r#"{"url":"https://example.com/"}"#).unwrap();
        assert_eq!(page.title_status, "fail");
        assert!(page.is_indexable);
        assert!(!page.mixed_content);
    }
}
