use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use webtrufflehog_host::cache::DedupCache;
use webtrufflehog_host::config::HostConfig;
use webtrufflehog_host::fetcher::HttpFetcher;
use webtrufflehog_host::host::run_host;
use webtrufflehog_host::logging;
use webtrufflehog_host::scanner::TrufflehogScanner;
use webtrufflehog_host::sink::ResultLog;
use webtrufflehog_host::worker::Pipeline;

/// webtrufflehog-host — native messaging host that scans browsed URLs for leaked secrets.
///
/// Browsers launch the host with only the caller origin, so every option also
/// reads from an environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "webtrufflehog-host", version, about, long_about = None)]
struct Cli {
    /// Caller origin passed by the browser (e.g. chrome-extension://<id>/).
    origin: Option<String>,

    /// Native window handle passed by the browser on Windows. Ignored.
    #[arg(long = "parent-window")]
    parent_window: Option<String>,

    /// Number of concurrent fetch/scan workers.
    #[arg(long, env = "WEBTRUFFLEHOG_WORKERS", default_value_t = 10)]
    workers: usize,

    /// HTTP fetch timeout in seconds.
    #[arg(long = "fetch-timeout-secs", env = "WEBTRUFFLEHOG_FETCH_TIMEOUT", default_value_t = 30)]
    fetch_timeout_secs: u64,

    /// Scanner timeout in seconds (0 = unbounded).
    #[arg(long = "scan-timeout-secs", env = "WEBTRUFFLEHOG_SCAN_TIMEOUT", default_value_t = 300)]
    scan_timeout_secs: u64,

    /// Path to the trufflehog binary.
    #[arg(long, env = "WEBTRUFFLEHOG_TRUFFLEHOG", default_value = "trufflehog")]
    trufflehog: PathBuf,

    /// Append-only results log (one JSON record per line).
    #[arg(long, env = "WEBTRUFFLEHOG_RESULTS", default_value = "/opt/webtrufflehog/results.json")]
    results: PathBuf,

    /// Log file. Stdout is reserved for the browser protocol.
    #[arg(long = "log-file", env = "WEBTRUFFLEHOG_LOG", default_value = "/opt/webtrufflehog/webtrufflehog.log")]
    log_file: PathBuf,

    /// Log level (error, warn, info, debug, trace). RUST_LOG overrides.
    #[arg(long = "log-level", env = "WEBTRUFFLEHOG_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn host_config(&self) -> HostConfig {
        HostConfig {
            workers: self.workers,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            scan_timeout: (self.scan_timeout_secs > 0)
                .then(|| Duration::from_secs(self.scan_timeout_secs)),
            trufflehog: self.trufflehog.clone(),
            results_path: self.results.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let guard = logging::init_logging(&cli.log_file, &cli.log_level);

    if let Err(e) = run(cli).await {
        error!(error = %format!("{e:#}"), "startup failed");
        eprintln!("webtrufflehog-host: {e:#}");
        return Err(e);
    }

    // The blocking stdin reader may still be parked after a Ctrl-C shutdown and
    // would hold the runtime open; flush logs and exit directly.
    drop(guard);
    std::process::exit(0);
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.host_config();
    info!(
        origin = cli.origin.as_deref().unwrap_or("<none>"),
        workers = config.worker_count(),
        fetch_timeout_secs = config.fetch_timeout.as_secs(),
        scan_timeout_secs = config.scan_timeout.map(|d| d.as_secs()).unwrap_or(0),
        results = %config.results_path.display(),
        "webtrufflehog-host starting"
    );

    let log = ResultLog::open(&config.results_path).await?;
    let fetcher = HttpFetcher::new().context("failed to build HTTP client")?;
    let scanner = TrufflehogScanner::new(config.trufflehog.clone(), config.scan_timeout);
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(DedupCache::new()),
        Arc::new(fetcher),
        Arc::new(scanner),
        config.fetch_timeout,
    ));

    // Ctrl-C ends input the same way the browser closing the pipe does.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel_ctrlc.cancel();
    });

    let summary = run_host(
        pipeline,
        config.worker_count(),
        log,
        tokio::io::stdin(),
        tokio::io::stdout(),
        cancel,
    )
    .await;

    info!(
        jobs_received = summary.jobs_received,
        results_delivered = summary.results_delivered,
        "webtrufflehog-host exiting"
    );
    Ok(())
}
