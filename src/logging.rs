//! Log setup. Stdout carries the native-messaging protocol, so logs go to a
//! file, or to stderr when the file cannot be used.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Parse a level name, defaulting to `info`.
pub fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "off" => LevelFilter::OFF,
        "error" => LevelFilter::ERROR,
        "warn" => LevelFilter::WARN,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    }
}

/// Initialize the global subscriber writing to `log_file`.
///
/// `RUST_LOG` overrides `level`. The returned guard flushes buffered lines and
/// must be held until exit; `None` means logging fell back to stderr.
pub fn init_logging(log_file: &Path, level: &str) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(parse_log_level(level).into())
        .from_env_lossy();

    let dir = log_file.parent().filter(|p| !p.as_os_str().is_empty());
    let file_name = log_file.file_name();
    let ready = match dir {
        Some(d) => std::fs::create_dir_all(d).is_ok(),
        None => true,
    };

    match (ready, file_name) {
        (true, Some(name)) => {
            let appender = tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}
