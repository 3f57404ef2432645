//! Logging setup.
//!
//! Logs go to stderr so stdout stays free for the report summaries the CLI
//! prints. `RUST_LOG` overrides the configured level when set.

use serde::{Deserialize, Serialize};
use tracing::{span, Level, Span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level.
    pub level: LogLevel,

    /// Whether to include the source file and line of each event.
    pub source_location: bool,

    /// Log format.
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level logging
    Trace,
    /// Debug level logging
    Debug,
    /// Info level logging
    Info,
    /// Warning level logging
    Warn,
    /// Error level logging
    Error,
}

impl LogLevel {
    /// Level name accepted by `EnvFilter`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Raise verbosity by `steps` levels (`-v` flags).
    pub fn more_verbose(self, steps: u8) -> Self {
        let order = [Self::Error, Self::Warn, Self::Info, Self::Debug, Self::Trace];
        let current = order.iter().position(|l| *l == self).unwrap_or(2);
        order[(current + usize::from(steps)).min(order.len() - 1)]
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs
    Json,
    /// Pretty formatted logs
    Pretty,
    /// Compact formatted logs
    Compact,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            source_location: false,
            format: LogFormat::Compact,
        }
    }
}

/// Initialize logging with configuration.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dataprobe={}", config.level.as_str())));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let fmt_layer = match config.format {
        LogFormat::Json => fmt_layer.json().with_ansi(false).boxed(),
        LogFormat::Pretty => fmt_layer.pretty().boxed(),
        LogFormat::Compact => fmt_layer.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Span wrapping one probe run (a tool call, a quote fetch, a query).
pub fn probe_span(kind: &'static str, subject: &str) -> Span {
    span!(Level::INFO, "probe", kind, subject = %subject)
}
