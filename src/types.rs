use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One detected secret as reported by the scanning engine. Never inspected by the pipeline.
pub type Finding = Value;

/// A request to scan one URL, created from an inbound `{id, url}` message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Job {
    pub id: Value,
    pub url: String,
}

/// Findings for one job. Only built when `findings` is non-empty.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub id: Value,
    pub url: String,
    pub findings: Vec<Finding>,
}

/// Reply to an inbound status query: number of jobs not yet picked up by a worker.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReply {
    pub status: usize,
}
