//! Logging setup for the `vitrine` binary.
//!
//! Installs a `tracing` subscriber with:
//! - a console layer on stderr, so command output on stdout stays clean
//! - when `logging.directory` is set, a daily-rotated file layer without ANSI
//!   colors (`vitrine.log.YYYY-MM-DD`)
//! - an `EnvFilter` taken from `RUST_LOG` when set, else from
//!   `logging.verbosity`

use crate::config::LoggingConfig;
use std::fs;
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// File name prefix of rotated log files.
pub const LOG_FILE_PREFIX: &str = "vitrine.log";

/// Keeps the background log writer alive.
///
/// Dropping it flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Filter from a `RUST_LOG`-style value, falling back to `verbosity` when it
/// is absent or unparsable.
fn filter_from(rust_log: Option<&str>, verbosity: &str) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(verbosity))
}

/// Install the global subscriber. Call once, early in `main`.
pub fn init_logging(config: &LoggingConfig) -> io::Result<LoggingGuard> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = filter_from(rust_log.as_deref(), &config.verbosity);

    let console_layer = fmt::layer().with_writer(io::stderr).with_target(false);

    let (file_layer, file_guard) = match &config.directory {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
