//! Library crate for webtrufflehog-host: a browser native-messaging host that
//! fetches URLs, scans them for leaked credentials, and streams findings back.
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod fingerprint;
pub mod host;
pub mod logging;
pub mod protocol;
pub mod queue;
pub mod scanner;
pub mod sink;
pub mod types;
pub mod worker;
