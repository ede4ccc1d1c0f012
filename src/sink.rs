use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::FrameWriter;
use crate::types::ScanResult;

/// Append-only newline-delimited JSON log of results. Never read back.
#[derive(Debug)]
pub struct ResultLog {
    path: PathBuf,
    file: File,
}

impl ResultLog {
    /// Open (creating if needed) the log and its parent directories.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create results directory: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open results log: {}", path.display()))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&mut self, result: &ScanResult) -> Result<()> {
        let mut line = serde_json::to_vec(result)?;
        line.push(b'\n');
        self.file.write_all(&line).await?;
        self.file.flush().await?;
        Ok(())
    }
}

/// Single consumer of the result channel, in channel order.
///
/// Persists each result, then forwards it to the client. A persistence failure
/// does not stop delivery. Returns the number of results delivered once every
/// sender has been dropped.
pub async fn run_sink<W>(
    mut results: mpsc::UnboundedReceiver<ScanResult>,
    mut log: ResultLog,
    out: FrameWriter<W>,
) -> usize
where
    W: AsyncWrite + Unpin + Send,
{
    let mut delivered = 0;
    while let Some(result) = results.recv().await {
        if let Err(e) = log.append(&result).await {
            warn!(path = %log.path().display(), url = %result.url, error = %e, "failed to persist result");
        }
        match out.send(&result).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!(url = %result.url, error = %e, "failed to deliver result"),
        }
    }
    debug!(delivered, "result sink stopped");
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::read_frame;
    use serde_json::json;

    #[tokio::test]
    async fn appends_one_line_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.json");
        let mut log = ResultLog::open(&path).await.unwrap();
        for n in 0..2 {
            log.append(&ScanResult {
                id: json!(n),
                url: format!("http://host/{n}"),
                findings: vec![json!({"DetectorName": "AWS"})],
            })
            .await
            .unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: ScanResult = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.url, "http://host/1");
    }

    #[tokio::test]
    async fn reopening_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let result = ScanResult {
            id: json!("a"),
            url: "http://a".into(),
            findings: vec![json!({})],
        };
        ResultLog::open(&path).await.unwrap().append(&result).await.unwrap();
        ResultLog::open(&path).await.unwrap().append(&result).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[tokio::test]
    async fn sink_stops_when_senders_drop() {
        let dir = tempfile::tempdir().unwrap();
        let log = ResultLog::open(dir.path().join("results.json")).await.unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ScanResult {
            id: json!(1),
            url: "http://a".into(),
            findings: vec![json!({"k": 1})],
        })
        .unwrap();
        drop(tx);

        let delivered = run_sink(rx, log, FrameWriter::new(Vec::new())).await;
        assert_eq!(delivered, 1);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn failed_persist_still_delivers() {
        let mut log = ResultLog::open("/dev/full").await.unwrap();
        let result = ScanResult {
            id: json!(7),
            url: "http://a".into(),
            findings: vec![json!({"DetectorName": "AWS"})],
        };
        assert!(log.append(&result).await.is_err());

        let (client, server) = tokio::io::duplex(64 * 1024);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(result.clone()).unwrap();
        drop(tx);

        let delivered = run_sink(rx, log, FrameWriter::new(server)).await;
        assert_eq!(delivered, 1);

        let mut client = client;
        let frame = read_frame(&mut client).await.unwrap().unwrap();
        assert_eq!(serde_json::from_value::<ScanResult>(frame).unwrap(), result);
    }
}
