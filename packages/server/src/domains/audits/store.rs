//! All SQL for the audits domain.
//!
//! Status transitions are conditional updates: a terminal row never
//! matches the guard, so racing writers serialize at the database and a
//! lost race is observable as zero affected rows.

use anyhow::{Context, Result};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::models::{Issue, Job, PageAudit, Summary};
use super::types::{IssueRecord, JobStatus, PageRecord, Severity, SummaryRecord};

/// Create a job row in `queued`.
pub async fn insert_job(
    pool: &PgPool,
    id: Uuid,
    domain: &str,
    start_url: &str,
    max_pages: i32,
    max_depth: i32,
    config: &serde_json::Value,
) -> Result<Job> {
    sqlx::query_as::<_, Job>(
        r#"
        INSERT INTO audit_jobs (id, domain, start_url, max_pages, max_depth, config, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'queued')
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(domain)
    .bind(start_url)
    .bind(max_pages)
    .bind(max_depth)
    .bind(config)
    .fetch_one(pool)
    .await
    .context("Failed to insert audit job")
}

/// queued → running, once the compute unit accepts the start request.
/// Returns the stored row either way; a job that left `queued` in the
/// meantime is untouched (terminal state is final).
pub async fn mark_running(pool: &PgPool, id: Uuid) -> Result<Job> {
    let updated = sqlx::query_as::<_, Job>(
        r#"
        UPDATE audit_jobs
        SET status = 'running',
            started_at = NOW()
        WHERE id = $1 AND status = 'queued'
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to mark audit job running")?;

    match updated {
        Some(job) => Ok(job),
        None => find_job(pool, id)
            .await?
            .context("Audit job disappeared while marking running"),
    }
}

/// Move a non-terminal job to failed. Returns the stored row either way;
/// a job already terminal is left untouched (terminal state is final).
pub async fn mark_failed(pool: &PgPool, id: Uuid, error: &str) -> Result<Job> {
    let updated = sqlx::query_as::<_, Job>(
        r#"
        UPDATE audit_jobs
        SET status = 'failed',
            error = $2,
            completed_at = NOW()
        WHERE id = $1 AND status NOT IN ('completed', 'failed')
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(error)
    .fetch_optional(pool)
    .await
    .context("Failed to mark audit job failed")?;

    match updated {
        Some(job) => Ok(job),
        None => find_job(pool, id)
            .await?
            .context("Audit job disappeared while marking failed"),
    }
}

pub async fn find_job(pool: &PgPool, id: Uuid) -> Result<Option<Job>> {
    sqlx::query_as::<_, Job>("SELECT * FROM audit_jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to load audit job")
}

/// List jobs newest-first. Filters are exact-match equality, ANDed.
pub async fn list_jobs(
    pool: &PgPool,
    domain: Option<&str>,
    status: Option<JobStatus>,
    limit: i64,
) -> Result<Vec<Job>> {
    sqlx::query_as::<_, Job>(
        r#"
        SELECT * FROM audit_jobs
        WHERE ($1::text IS NULL OR domain = $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(domain)
    .bind(status.map(|s| s.as_str()))
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list audit jobs")
}

pub async fn find_summary(pool: &PgPool, job_id: Uuid) -> Result<Option<Summary>> {
    sqlx::query_as::<_, Summary>("SELECT * FROM audit_summaries WHERE job_id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await
        .context("Failed to load audit summary")
}

/// Issues for a job, ordered critical, warning, info.
pub async fn list_issues(
    pool: &PgPool,
    job_id: Uuid,
    severity: Option<Severity>,
) -> Result<Vec<Issue>> {
    sqlx::query_as::<_, Issue>(
        r#"
        SELECT * FROM issues
        WHERE job_id = $1
          AND ($2::text IS NULL OR severity = $2)
        ORDER BY CASE severity
            WHEN 'critical' THEN 0
            WHEN 'warning' THEN 1
            ELSE 2
        END, seq
        "#,
    )
    .bind(job_id)
    .bind(severity.map(|s| s.as_str()))
    .fetch_all(pool)
    .await
    .context("Failed to list issues")
}

// "Problems" per the audit projection: failed title or meta description,
// no h1, no viewport, or mixed content.
const PROBLEMS_PREDICATE: &str = "(title_status = 'fail'
       OR meta_desc_status = 'fail'
       OR h1_count = 0
       OR has_viewport = FALSE
       OR mixed_content = TRUE)";

pub async fn list_pages(
    pool: &PgPool,
    job_id: Uuid,
    problems_only: bool,
    limit: i64,
    offset: i64,
) -> Result<Vec<PageAudit>> {
    let sql = format!(
        r#"
        SELECT * FROM page_audits
        WHERE job_id = $1
          AND ($2 = FALSE OR {PROBLEMS_PREDICATE})
        ORDER BY url
        LIMIT $3 OFFSET $4
        "#
    );

    sqlx::query_as::<_, PageAudit>(&sql)
        .bind(job_id)
        .bind(problems_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list page audits")
}

/// Total rows matching the pages filter, ignoring limit/offset.
pub async fn count_pages(pool: &PgPool, job_id: Uuid, problems_only: bool) -> Result<i64> {
    let sql = format!(
        r#"
        SELECT COUNT(*) FROM page_audits
        WHERE job_id = $1
          AND ($2 = FALSE OR {PROBLEMS_PREDICATE})
        "#
    );

    sqlx::query_scalar::<_, i64>(&sql)
        .bind(job_id)
        .bind(problems_only)
        .fetch_one(pool)
        .await
        .context("Failed to count page audits")
}

// =============================================================================
// Ingestion writes (run inside one transaction per job)
// =============================================================================

/// Claim the completed transition. Only succeeds while the job is still
/// non-terminal; concurrent pollers racing to ingest serialize here, and
/// the loser sees `None`.
///
/// Progress counters and score are set in the same statement so a reader
/// never observes completed with stale numbers.
pub async fn claim_completion(
    conn: &mut PgConnection,
    id: Uuid,
    pages_found: i32,
    pages_done: i32,
    score: Option<i32>,
) -> Result<Option<Job>> {
    sqlx::query_as::<_, Job>(
        r#"
        UPDATE audit_jobs
        SET status = 'completed',
            pages_found = $2,
            pages_done = $3,
            score = $4,
            completed_at = NOW()
        WHERE id = $1 AND status NOT IN ('completed', 'failed')
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(pages_found)
    .bind(pages_done)
    .bind(score)
    .fetch_optional(conn)
    .await
    .context("Failed to claim completion")
}

/// Bulk-insert page audit rows as one UNNEST statement.
pub async fn insert_page_audits(
    conn: &mut PgConnection,
    job_id: Uuid,
    pages: &[PageRecord],
) -> Result<()> {
    if pages.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = pages.iter().map(|_| Uuid::new_v4()).collect();
    let job_ids: Vec<Uuid> = pages.iter().map(|_| job_id).collect();
    let urls: Vec<String> = pages.iter().map(|p| p.url.clone()).collect();
    let status_codes: Vec<i32> = pages.iter().map(|p| p.status_code).collect();
    let titles: Vec<Option<String>> = pages.iter().map(|p| p.title.clone()).collect();
    let title_lengths: Vec<i32> = pages.iter().map(|p| p.title_length).collect();
    let title_statuses: Vec<String> = pages.iter().map(|p| p.title_status.clone()).collect();
    let meta_descs: Vec<Option<String>> = pages.iter().map(|p| p.meta_desc.clone()).collect();
    let meta_desc_lengths: Vec<i32> = pages.iter().map(|p| p.meta_desc_length).collect();
    let meta_desc_statuses: Vec<String> =
        pages.iter().map(|p| p.meta_desc_status.clone()).collect();
    let h1_counts: Vec<i32> = pages.iter().map(|p| p.h1_count).collect();
    let has_canonicals: Vec<bool> = pages.iter().map(|p| p.has_canonical).collect();
    let is_indexables: Vec<bool> = pages.iter().map(|p| p.is_indexable).collect();
    let has_json_lds: Vec<bool> = pages.iter().map(|p| p.has_json_ld).collect();
    let has_viewports: Vec<bool> = pages.iter().map(|p| p.has_viewport).collect();
    let has_og_tags: Vec<bool> = pages.iter().map(|p| p.has_og_tags).collect();
    let word_counts: Vec<i32> = pages.iter().map(|p| p.word_count).collect();
    let images_totals: Vec<i32> = pages.iter().map(|p| p.images_total).collect();
    let images_no_alts: Vec<i32> = pages.iter().map(|p| p.images_no_alt).collect();
    let internal_links: Vec<i32> = pages.iter().map(|p| p.internal_links).collect();
    let external_links: Vec<i32> = pages.iter().map(|p| p.external_links).collect();
    let mixed_contents: Vec<bool> = pages.iter().map(|p| p.mixed_content).collect();
    let audit_jsons: Vec<serde_json::Value> =
        pages.iter().map(|p| p.audit_json.clone()).collect();

    sqlx::query(
        r#"
        INSERT INTO page_audits (
            id, job_id, url, status_code,
            title, title_length, title_status,
            meta_desc, meta_desc_length, meta_desc_status,
            h1_count, has_canonical, is_indexable, has_json_ld,
            has_viewport, has_og_tags,
            word_count, images_total, images_no_alt,
            internal_links, external_links, mixed_content, audit_json
        )
        SELECT * FROM UNNEST(
            $1::uuid[], $2::uuid[], $3::text[], $4::int[],
            $5::text[], $6::int[], $7::text[],
            $8::text[], $9::int[], $10::text[],
            $11::int[], $12::bool[], $13::bool[], $14::bool[],
            $15::bool[], $16::bool[],
            $17::int[], $18::int[], $19::int[],
            $20::int[], $21::int[], $22::bool[], $23::jsonb[]
        )
        "#,
    )
    .bind(&ids)
    .bind(&job_ids)
    .bind(&urls)
    .bind(&status_codes)
    .bind(&titles)
    .bind(&title_lengths)
    .bind(&title_statuses)
    .bind(&meta_descs)
    .bind(&meta_desc_lengths)
    .bind(&meta_desc_statuses)
    .bind(&h1_counts)
    .bind(&has_canonicals)
    .bind(&is_indexables)
    .bind(&has_json_lds)
    .bind(&has_viewports)
    .bind(&has_og_tags)
    .bind(&word_counts)
    .bind(&images_totals)
    .bind(&images_no_alts)
    .bind(&internal_links)
    .bind(&external_links)
    .bind(&mixed_contents)
    .bind(&audit_jsons)
    .execute(conn)
    .await
    .context("Failed to batch-insert page audits")?;

    Ok(())
}

/// Bulk-insert issue rows as one UNNEST statement.
pub async fn insert_issues(
    conn: &mut PgConnection,
    job_id: Uuid,
    issues: &[IssueRecord],
) -> Result<()> {
    if issues.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = issues.iter().map(|_| Uuid::new_v4()).collect();
    let job_ids: Vec<Uuid> = issues.iter().map(|_| job_id).collect();
    let seqs: Vec<i32> = (0..issues.len() as i32).collect();
    let issue_types: Vec<String> = issues.iter().map(|i| i.issue_type.clone()).collect();
    let severities: Vec<String> = issues
        .iter()
        .map(|i| i.severity.as_str().to_string())
        .collect();
    let descriptions: Vec<String> = issues.iter().map(|i| i.description.clone()).collect();
    let fixes: Vec<Option<String>> = issues.iter().map(|i| i.fix.clone()).collect();
    let affected_counts: Vec<i32> = issues.iter().map(|i| i.affected_count).collect();
    let affected_urls: Vec<serde_json::Value> = issues
        .iter()
        .map(|i| serde_json::json!(i.affected_urls))
        .collect();

    sqlx::query(
        r#"
        INSERT INTO issues (
            id, job_id, seq, issue_type, severity, description, fix,
            affected_count, affected_urls
        )
        SELECT * FROM UNNEST(
            $1::uuid[], $2::uuid[], $3::int[], $4::text[], $5::text[], $6::text[],
            $7::text[], $8::int[], $9::jsonb[]
        )
        "#,
    )
    .bind(&ids)
    .bind(&job_ids)
    .bind(&seqs)
    .bind(&issue_types)
    .bind(&severities)
    .bind(&descriptions)
    .bind(&fixes)
    .bind(&affected_counts)
    .bind(&affected_urls)
    .execute(conn)
    .await
    .context("Failed to batch-insert issues")?;

    Ok(())
}

pub async fn insert_summary(
    conn: &mut PgConnection,
    job_id: Uuid,
    summary: &SummaryRecord,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_summaries (
            job_id, pages_audited, score,
            issues_critical, issues_warning, issues_info, audit_json
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(job_id)
    .bind(summary.pages_audited)
    .bind(summary.score)
    .bind(summary.issues_critical)
    .bind(summary.issues_warning)
    .bind(summary.issues_info)
    .bind(&summary.audit_json)
    .execute(conn)
    .await
    .context("Failed to insert audit summary")?;

    Ok(())
}
