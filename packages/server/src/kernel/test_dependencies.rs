// Mock implementations for testing
//
// Provides scripted fakes that can be injected into ServerDeps so the
// orchestrator and transports can be tested without a compute unit or
// blob store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::traits::{BaseCrawlerUnit, BaseSnapshotStore, CrawlerUnitError};
use crate::domains::audits::types::CrawlStatusReport;

// =============================================================================
// Mock Crawler Unit
// =============================================================================

/// Arguments captured from a start call
#[derive(Debug, Clone)]
pub struct StartCallArgs {
    pub job_id: Uuid,
    pub url: String,
    pub max_pages: i32,
    pub max_depth: i32,
}

/// Scripted compute-unit fake.
///
/// Status reports are consumed in order; once the script is exhausted the
/// last report is repeated. Every call is counted so tests can assert that
/// terminal jobs never re-contact the unit.
pub struct MockCrawlerUnit {
    start_error: Mutex<Option<String>>,
    status_script: Mutex<Vec<CrawlStatusReport>>,
    status_error: Mutex<Option<String>>,
    start_calls: Mutex<Vec<StartCallArgs>>,
    status_call_count: Mutex<usize>,
}

impl MockCrawlerUnit {
    pub fn new() -> Self {
        Self {
            start_error: Mutex::new(None),
            status_script: Mutex::new(Vec::new()),
            status_error: Mutex::new(None),
            start_calls: Mutex::new(Vec::new()),
            status_call_count: Mutex::new(0),
        }
    }

    /// Make every start call fail with the given message
    pub fn with_start_error(self, message: &str) -> Self {
        *self.start_error.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Queue a status report to be returned (in order)
    pub fn with_status_report(self, report: CrawlStatusReport) -> Self {
        self.status_script.lock().unwrap().push(report);
        self
    }

    /// Make every status call fail with the given message
    pub fn with_status_error(self, message: &str) -> Self {
        *self.status_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn start_calls(&self) -> Vec<StartCallArgs> {
        self.start_calls.lock().unwrap().clone()
    }

    pub fn status_call_count(&self) -> usize {
        *self.status_call_count.lock().unwrap()
    }
}

impl Default for MockCrawlerUnit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseCrawlerUnit for MockCrawlerUnit {
    async fn start(
        &self,
        job_id: Uuid,
        url: &str,
        max_pages: i32,
        max_depth: i32,
    ) -> Result<(), CrawlerUnitError> {
        self.start_calls.lock().unwrap().push(StartCallArgs {
            job_id,
            url: url.to_string(),
            max_pages,
            max_depth,
        });

        if let Some(message) = self.start_error.lock().unwrap().clone() {
            return Err(CrawlerUnitError::Unavailable(message));
        }
        Ok(())
    }

    async fn status(&self, _job_id: Uuid) -> Result<CrawlStatusReport, CrawlerUnitError> {
        let mut count = self.status_call_count.lock().unwrap();
        *count += 1;
        let call_index = *count - 1;
        drop(count);

        if let Some(message) = self.status_error.lock().unwrap().clone() {
            return Err(CrawlerUnitError::Unavailable(message));
        }

        let script = self.status_script.lock().unwrap();
        match script.get(call_index).or_else(|| script.last()) {
            Some(report) => Ok(report.clone()),
            None => Err(CrawlerUnitError::Unavailable(
                "no status scripted".to_string(),
            )),
        }
    }

    async fn health(&self) -> Result<(), CrawlerUnitError> {
        Ok(())
    }
}

// =============================================================================
// Memory Snapshot Store
// =============================================================================

/// In-memory snapshot store capturing puts for assertions.
pub struct MemorySnapshotStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_puts: bool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(Mutex::new(HashMap::new())),
            fail_puts: false,
        }
    }

    /// Make every put fail, for verifying snapshot failures never abort
    /// structured ingestion
    pub fn failing() -> Self {
        Self {
            blobs: Arc::new(Mutex::new(HashMap::new())),
            fail_puts: true,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(key).cloned()
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSnapshotStore for MemorySnapshotStore {
    async fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        if self.fail_puts {
            anyhow::bail!("snapshot store rejected put for {key}");
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), body.to_vec());
        Ok(())
    }
}
