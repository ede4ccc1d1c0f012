use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::types::Finding;

/// File name the content is written to inside the per-job scratch directory.
const SCAN_TARGET: &str = "scan_target.txt";

/// Runs secret detection over a blob of text.
#[async_trait]
pub trait SecretScanner: Send + Sync {
    async fn scan(&self, content: &str) -> Result<Vec<Finding>, ScanError>;
}

/// Adapter for the `trufflehog` command line tool.
///
/// Each call:
/// - creates a scratch directory and writes the content to `scan_target.txt`,
/// - runs `trufflehog filesystem <file> --json`,
/// - parses every non-blank stdout line as one finding,
/// - removes the scratch directory on every exit path.
///
/// A nonzero exit or unparsable output yields zero findings and a warning.
/// Only a failure to run the tool at all (or a timeout) is an error.
#[derive(Debug, Clone)]
pub struct TrufflehogScanner {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl TrufflehogScanner {
    /// `timeout` of `None` lets a scan run for as long as the tool takes.
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    async fn run(&self, target: &Path) -> Result<Vec<Finding>, ScanError> {
        let child = Command::new(&self.program)
            .arg("filesystem")
            .arg(target)
            .arg("--json")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ScanError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let output = match self.timeout {
            Some(limit) => time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ScanError::Timeout(limit))?,
            None => child.wait_with_output().await,
        }
        .map_err(ScanError::Wait)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                status = %output.status,
                stderr = %stderr.trim(),
                "scanner exited unsuccessfully, treating as no findings"
            );
            return Ok(Vec::new());
        }

        match parse_findings(&String::from_utf8_lossy(&output.stdout)) {
            Ok(findings) => Ok(findings),
            Err(e) => {
                warn!(error = %e, "scanner produced malformed output, treating as no findings");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl SecretScanner for TrufflehogScanner {
    async fn scan(&self, content: &str) -> Result<Vec<Finding>, ScanError> {
        if content.is_empty() {
            return Ok(Vec::new());
        }

        let scratch = TempDir::new().map_err(ScanError::Scratch)?;
        let target = scratch.path().join(SCAN_TARGET);
        let outcome = match tokio::fs::write(&target, content).await {
            Ok(()) => self.run(&target).await,
            Err(e) => Err(ScanError::Scratch(e)),
        };

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!(path = %scratch_path.display(), error = %e, "failed to remove scratch directory");
        }

        if let Ok(findings) = &outcome {
            debug!(count = findings.len(), "scan complete");
        }
        outcome
    }
}

/// Parse newline-delimited JSON findings, skipping blank lines.
pub fn parse_findings(stdout: &str) -> Result<Vec<Finding>, serde_json::Error> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str)
        .collect()
}
