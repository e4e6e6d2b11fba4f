//! # kubeframe-logging
//!
//! Structured logging with `tracing` and an optional JSON-lines file sink.
//!
//! The file sink can be closed independently of the subscriber, which is how
//! a cluster frame flushes its log file during teardown while stdout logging
//! keeps working.

#![deny(unsafe_code)]

mod file;

pub use file::{FileLogLayer, FileLogRecord, FileLogSink};

use std::path::Path;
use std::sync::Arc;

use kubeframe_settings::LoggingSettings;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Errors raised while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The log file could not be opened.
    #[error("failed to open log file {path}: {source}")]
    File {
        /// Requested path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A global subscriber was already installed.
    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Keeps the file sink reachable after the subscriber is installed.
#[derive(Debug, Default)]
pub struct LoggingGuard {
    file_sink: Option<Arc<FileLogSink>>,
}

impl LoggingGuard {
    /// The file sink, if file logging is enabled.
    pub fn file_sink(&self) -> Option<&Arc<FileLogSink>> {
        self.file_sink.as_ref()
    }

    /// Flush and close the log file. No-op without a file sink or when it
    /// is already closed.
    pub fn close_file_logging(&self) {
        if let Some(sink) = &self.file_sink {
            if sink.close() {
                tracing::debug!(path = %sink.path().display(), "file logging closed");
            }
        }
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(settings: &LoggingSettings) -> Result<LoggingGuard, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let fmt_layer = if settings.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    let file_sink = match &settings.file_path {
        Some(path) => Some(Arc::new(FileLogSink::new(Path::new(path)).map_err(
            |source| LoggingError::File {
                path: path.clone(),
                source,
            },
        )?)),
        None => None,
    };
    let file_layer = file_sink
        .as_ref()
        .map(|sink| FileLogLayer::new(Arc::clone(sink), file_level(&settings.level)));

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .with(file_layer)
        .try_init()?;

    Ok(LoggingGuard { file_sink })
}

/// Minimum level written to the file sink, derived from the configured
/// directive. Anything that is not a bare level falls back to INFO.
fn file_level(directive: &str) -> Level {
    directive.trim().parse().unwrap_or(Level::INFO)
}
