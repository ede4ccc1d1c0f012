use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::DedupCache;
use crate::error::JobError;
use crate::fetcher::ContentFetcher;
use crate::fingerprint::Fingerprint;
use crate::queue::JobReceiver;
use crate::scanner::SecretScanner;
use crate::types::{Job, ScanResult};

/// What happened to one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The URL was already claimed by an earlier job.
    Duplicate,
    /// The fetch succeeded but returned an empty body.
    NothingToScan,
    /// Scanned (or served from cache) with zero findings.
    Clean,
    Findings(ScanResult),
}

/// Everything a worker needs to process a job: the shared cache plus the
/// fetch and scan collaborators. Built once and shared by the whole pool.
pub struct Pipeline {
    cache: Arc<DedupCache>,
    fetcher: Arc<dyn ContentFetcher>,
    scanner: Arc<dyn SecretScanner>,
    fetch_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        cache: Arc<DedupCache>,
        fetcher: Arc<dyn ContentFetcher>,
        scanner: Arc<dyn SecretScanner>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            fetcher,
            scanner,
            fetch_timeout,
        }
    }

    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// Run one job through claim, fetch, content lookup and scan.
    ///
    /// The URL is claimed before fetching, so a job that later fails still
    /// keeps its URL from being retried.
    pub async fn process(&self, job: Job) -> Result<JobOutcome, JobError> {
        if !self.cache.mark_if_new(&Fingerprint::of_url(&job.url)) {
            return Ok(JobOutcome::Duplicate);
        }

        let content = self.fetcher.fetch(&job.url, self.fetch_timeout).await?;
        if content.is_empty() {
            return Ok(JobOutcome::NothingToScan);
        }

        let content_fp = Fingerprint::of_content(&content);
        let findings = match self.cache.lookup(&content_fp) {
            Some(hit) => {
                debug!(url = %job.url, content = %content_fp, "content cache hit");
                hit
            }
            None => {
                let fresh = Arc::new(self.scanner.scan(&content).await?);
                self.cache.store(content_fp, Arc::clone(&fresh));
                fresh
            }
        };

        if findings.is_empty() {
            return Ok(JobOutcome::Clean);
        }
        Ok(JobOutcome::Findings(ScanResult {
            id: job.id,
            url: job.url,
            findings: findings.as_ref().clone(),
        }))
    }
}

/// Worker loop: drain `jobs` until the queue is closed and empty.
///
/// Failures and panics inside a job are logged and never end the loop.
pub async fn run_worker(
    worker: usize,
    pipeline: Arc<Pipeline>,
    jobs: JobReceiver,
    results: mpsc::UnboundedSender<ScanResult>,
) {
    debug!(worker, "worker started");
    while let Some(job) = jobs.pop().await {
        let job_id = job.id.clone();
        let url = job.url.clone();

        match AssertUnwindSafe(pipeline.process(job)).catch_unwind().await {
            Ok(Ok(JobOutcome::Findings(result))) => {
                info!(worker, %job_id, %url, count = result.findings.len(), "secrets found");
                if results.send(result).is_err() {
                    warn!(worker, %url, "result channel closed, dropping result");
                }
            }
            Ok(Ok(outcome)) => debug!(worker, %job_id, %url, ?outcome, "job finished"),
            Ok(Err(e)) => warn!(worker, %job_id, %url, error = %e, "job failed"),
            Err(_) => warn!(worker, %job_id, %url, "job panicked"),
        }
    }
    debug!(worker, "worker stopped");
}
