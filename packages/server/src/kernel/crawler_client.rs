//! HTTP client for the per-job compute units.
//!
//! Units are addressed as `{base_url}/units/{job_id}/...` so a job id
//! always reaches the same unit instance for the job's lifetime. First
//! contact may hit a cold-starting unit; the request timeout is sized
//! for tens of seconds accordingly.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use super::traits::{BaseCrawlerUnit, CrawlerUnitError};
use crate::domains::audits::types::CrawlStatusReport;

pub struct HttpCrawlerUnit {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct StartRequest<'a> {
    job_id: Uuid,
    url: &'a str,
    max_pages: i32,
    max_depth: i32,
}

impl HttpCrawlerUnit {
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self> {
        // The timeout is load-bearing: first contact can hit a
        // cold-starting unit, so a client without it must never be used.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build compute-unit HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn unit_url(&self, job_id: Uuid, path: &str) -> String {
        format!("{}/units/{}{}", self.base_url, job_id, path)
    }
}

#[async_trait]
impl BaseCrawlerUnit for HttpCrawlerUnit {
    async fn start(
        &self,
        job_id: Uuid,
        url: &str,
        max_pages: i32,
        max_depth: i32,
    ) -> Result<(), CrawlerUnitError> {
        let response = self
            .client
            .post(self.unit_url(job_id, "/start"))
            .json(&StartRequest {
                job_id,
                url,
                max_pages,
                max_depth,
            })
            .send()
            .await
            .map_err(|e| CrawlerUnitError::Unavailable(format!("start request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CrawlerUnitError::Unavailable(format!(
                "start rejected with status {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn status(&self, job_id: Uuid) -> Result<CrawlStatusReport, CrawlerUnitError> {
        let response = self
            .client
            .get(self.unit_url(job_id, "/status"))
            .send()
            .await
            .map_err(|e| CrawlerUnitError::Unavailable(format!("status request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CrawlerUnitError::Unavailable(format!(
                "status returned {}",
                response.status()
            )));
        }

        response
            .json::<CrawlStatusReport>()
            .await
            .map_err(|e| CrawlerUnitError::BadResponse(e.to_string()))
    }

    async fn health(&self) -> Result<(), CrawlerUnitError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| CrawlerUnitError::Unavailable(format!("health request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CrawlerUnitError::Unavailable(format!(
                "health returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_urls_are_stable_per_job() {
        let client = HttpCrawlerUnit::new("http://crawler.internal/".to_string(), 60).unwrap();
        let job_id = Uuid::new_v4();

        let first = client.unit_url(job_id, "/start");
        let second = client.unit_url(job_id, "/status");

        assert_eq!(
            first,
            format!("http://crawler.internal/units/{}/start", job_id)
        );
        assert_eq!(
            second,
            format!("http://crawler.internal/units/{}/status", job_id)
        );
    }
}
