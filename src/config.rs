use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on the worker pool size.
pub const MAX_WORKERS: usize = 256;

/// Runtime settings for the host.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub workers: usize,
    pub fetch_timeout: Duration,
    /// `None` lets a scan run unbounded.
    pub scan_timeout: Option<Duration>,
    pub trufflehog: PathBuf,
    pub results_path: PathBuf,
}

impl HostConfig {
    /// Worker count clamped to `1..=MAX_WORKERS`.
    pub fn worker_count(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            fetch_timeout: Duration::from_secs(30),
            scan_timeout: Some(Duration::from_secs(300)),
            trufflehog: PathBuf::from("trufflehog"),
            results_path: PathBuf::from("/opt/webtrufflehog/results.json"),
        }
    }
}
