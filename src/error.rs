use std::time::Duration;

use thiserror::Error;

/// Failure to retrieve a URL's content.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("server returned {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("failed to read body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Failure to run the scanning engine. Engine-reported problems (nonzero exit,
/// unparsable output) are not errors; they yield zero findings instead.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("scratch area error: {0}")]
    Scratch(#[source] std::io::Error),
    #[error("failed to launch scanner `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for scanner: {0}")]
    Wait(#[source] std::io::Error),
    #[error("scan timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure of a single job. Never fatal to the worker that hit it.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),
}

/// Failure on the boundary channel.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame of {len} bytes exceeds limit of {limit} bytes")]
    TooLarge { len: usize, limit: usize },
    #[error("truncated frame: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}
