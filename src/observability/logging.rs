//! Structured logging.
//!
//! # Responsibilities
//! - Install the process-wide `tracing` subscriber once, in `main`
//! - Provide the injected [`Logger`] handle used by the request pipeline
//! - Route records to the console and, in production, to rotating files
//!
//! # Design Decisions
//! - JSON format for production, compact colorized format otherwise; the
//!   JSON layout embeds metadata as objects (see [`StructuredJson`])
//! - Minimum level follows the deployment mode; `RUST_LOG` overrides it
//! - File sinks are non-blocking; the returned guard flushes on drop

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
    Layer,
};

use crate::config::{DeploymentMode, LoggingConfig};
use crate::observability::format::StructuredJson;
use crate::observability::rotation::rotating_file;

/// Actor recorded by audit entries that have no caller.
pub const SYSTEM_ACTOR: &str = "system";

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Minimum level for a deployment mode.
    pub fn minimum_for(mode: DeploymentMode) -> Self {
        if mode.is_production() {
            Self::Info
        } else {
            Self::Debug
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emit a `tracing` event at a level only known at runtime.
macro_rules! emit {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            $crate::observability::logging::LogLevel::Debug => ::tracing::debug!($($arg)+),
            $crate::observability::logging::LogLevel::Info => ::tracing::info!($($arg)+),
            $crate::observability::logging::LogLevel::Warn => ::tracing::warn!($($arg)+),
            $crate::observability::logging::LogLevel::Error => ::tracing::error!($($arg)+),
        }
    };
}

pub(crate) use emit;

/// Structured metadata attached to a record.
///
/// Recorded as a single field so arbitrary keys survive both encodings: JSON
/// text in the compact console, a nested object in production JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("{}"),
        }
    }
}

/// What the logger needs to know about a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub message: String,
    pub kind: &'static str,
    pub stack: Option<String>,
}

impl ErrorReport {
    /// Report for an arbitrary error, flattening its source chain.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            message,
            kind: "Error",
            stack: None,
        }
    }
}

/// Handle to the process-wide log sinks.
///
/// Cheap to clone; constructed once in `main` and passed to every component
/// that logs. Writes never fail from the caller's point of view.
#[derive(Debug, Clone)]
pub struct Logger {
    service: Arc<str>,
    version: Arc<str>,
}

impl Logger {
    pub fn new(service: impl Into<Arc<str>>) -> Self {
        Self {
            service: service.into(),
            version: Arc::from(env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::new(config.service_name.as_str())
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Emit one record. Records below the active minimum level are dropped
    /// by the subscriber before any formatting happens.
    pub fn log(&self, level: LogLevel, message: &str, metadata: &Metadata) {
        if metadata.is_empty() {
            emit!(
                level,
                service = %self.service,
                version = %self.version,
                "{}",
                message
            );
        } else {
            emit!(
                level,
                service = %self.service,
                version = %self.version,
                metadata = %metadata,
                "{}",
                message
            );
        }
    }

    pub fn debug(&self, message: &str, metadata: &Metadata) {
        self.log(LogLevel::Debug, message, metadata);
    }

    pub fn info(&self, message: &str, metadata: &Metadata) {
        self.log(LogLevel::Info, message, metadata);
    }

    pub fn warn(&self, message: &str, metadata: &Metadata) {
        self.log(LogLevel::Warn, message, metadata);
    }

    pub fn error(&self, message: &str, metadata: &Metadata) {
        self.log(LogLevel::Error, message, metadata);
    }

    /// Log a failure at `error` level with its message, kind and stack.
    pub fn log_error(&self, report: &ErrorReport, context: &Metadata) {
        tracing::error!(
            service = %self.service,
            version = %self.version,
            error.message = %report.message,
            error.kind = report.kind,
            error.stack = report.stack.as_deref(),
            context = %context,
            "Application error"
        );
    }

    /// Record an auditable action. A missing actor is recorded as
    /// [`SYSTEM_ACTOR`].
    pub fn audit(&self, action: &str, actor_id: Option<&str>, details: &Metadata) {
        tracing::info!(
            service = %self.service,
            version = %self.version,
            audit = true,
            action,
            user_id = actor_id.unwrap_or(SYSTEM_ACTOR),
            timestamp = %iso_timestamp(),
            details = %details,
            "Audit log"
        );
    }
}

/// Current UTC time as ISO-8601 with millisecond precision.
pub fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Error type for logger initialization.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file: {0}")]
    Sink(#[from] std::io::Error),

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Keeps the non-blocking file writers alive; dropping it flushes them.
#[must_use = "dropping the guard stops the file sinks"]
pub struct LoggingGuard {
    _workers: Vec<WorkerGuard>,
}

/// Initialize the global subscriber for the deployment mode.
pub fn init_logging(
    mode: DeploymentMode,
    config: &LoggingConfig,
) -> Result<LoggingGuard, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LogLevel::minimum_for(mode).as_str()));

    let json_console = mode
        .is_production()
        .then(|| tfmt::layer().event_format(StructuredJson));
    let compact_console =
        (!mode.is_production()).then(|| tfmt::layer().compact().with_ansi(true));

    let mut workers = Vec::new();
    let file_sinks = if mode.is_production() {
        let dir = Path::new(&config.directory);
        let (errors, errors_guard) = tracing_appender::non_blocking(rotating_file(
            dir,
            "error.log",
            config.max_file_bytes,
            config.max_files,
        )?);
        let (combined, combined_guard) = tracing_appender::non_blocking(rotating_file(
            dir,
            "combined.log",
            config.max_file_bytes,
            config.max_files,
        )?);
        workers.push(errors_guard);
        workers.push(combined_guard);

        Some(
            tfmt::layer()
                .event_format(StructuredJson)
                .with_ansi(false)
                .with_writer(errors)
                .with_filter(LevelFilter::ERROR)
                .and_then(
                    tfmt::layer()
                        .event_format(StructuredJson)
                        .with_ansi(false)
                        .with_writer(combined),
                ),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_console)
        .with(compact_console)
        .with(file_sinks)
        .try_init()?;

    Ok(LoggingGuard { _workers: workers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn minimum_level_follows_mode() {
        assert_eq!(LogLevel::minimum_for(DeploymentMode::Development), LogLevel::Debug);
        assert_eq!(LogLevel::minimum_for(DeploymentMode::Test), LogLevel::Debug);
        assert_eq!(LogLevel::minimum_for(DeploymentMode::Production), LogLevel::Info);
        assert!(LogLevel::Debug < LogLevel::Error);
    }

    #[test]
    fn metadata_renders_as_json_object() {
        let metadata = Metadata::new()
            .with("method", "GET")
            .with("statusCode", 404)
            .with("userId", Option::<String>::None);

        let parsed: Value = serde_json::from_str(&metadata.to_string()).unwrap();
        assert_eq!(parsed["method"], "GET");
        assert_eq!(parsed["statusCode"], 404);
        assert!(parsed["userId"].is_null());
    }

    #[test]
    fn error_report_flattens_sources() {
        #[derive(Debug, Error)]
        #[error("loading failed")]
        struct Outer(#[source] io::Error);

        let err = Outer(io::Error::new(io::ErrorKind::NotFound, "missing file"));
        let report = ErrorReport::from_error(&err);
        assert_eq!(report.message, "loading failed: missing file");
        assert_eq!(report.kind, "Error");
        assert!(report.stack.is_none());
    }

    #[test]
    fn timestamps_are_utc_with_millis() {
        let ts = iso_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        assert_eq!(ts.len(), "2025-11-08T12:00:00.000Z".len());
    }

    #[test]
    fn logger_carries_service_identity() {
        let logger = Logger::from_config(&LoggingConfig::default());
        assert_eq!(logger.service(), "reqapp-backend");
        assert_eq!(logger.version(), env!("CARGO_PKG_VERSION"));
    }
}
