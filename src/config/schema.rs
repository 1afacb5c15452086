//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the backend.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Root configuration for the backend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment mode, fixed for the process lifetime.
    pub mode: DeploymentMode,

    /// Listener and request handling settings.
    pub server: ServerConfig,

    /// Log sinks.
    pub logging: LoggingConfig,

    /// Request observation and metrics.
    pub observability: ObservabilityConfig,

    /// CORS and response hardening.
    pub security: SecurityConfig,
}

/// Fixed operating mode selected once at process start.
///
/// Governs log verbosity, log encoding, file sinks and stack-trace disclosure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    #[default]
    Development,
    Production,
    Test,
}

impl DeploymentMode {
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Whether error envelopes may carry stack traces.
    pub fn exposes_stack_traces(self) -> bool {
        !self.is_production()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(format!("unknown deployment mode '{other}'")),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port. `0` asks the OS for an ephemeral port.
    pub port: u16,

    /// Maximum accepted request body in bytes.
    pub body_limit_bytes: usize,

    /// How long in-flight requests may run after a termination signal.
    pub shutdown_grace_secs: u64,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            body_limit_bytes: 10 * 1024 * 1024,
            shutdown_grace_secs: 10,
        }
    }
}

/// Log sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Service identity attached to every record.
    pub service_name: String,

    /// Directory for the production file sinks.
    pub directory: String,

    /// Size bound of one log file before it is rotated.
    pub max_file_bytes: u64,

    /// Number of files retained per sink, active file included.
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            service_name: "reqapp-backend".to_string(),
            directory: "logs".to_string(),
            max_file_bytes: 5 * 1024 * 1024,
            max_files: 5,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Requests slower than this get an extra warning record.
    pub slow_request_ms: u64,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Address for the Prometheus listener.
    pub metrics_address: String,
}

impl ObservabilityConfig {
    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_ms)
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            slow_request_ms: 1000,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// CORS and response header hardening.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Origins allowed by CORS in production. Development always allows the
    /// local frontend dev server.
    pub allowed_origins: Vec<String>,

    /// Attach the default security headers to every response.
    pub security_headers: bool,
}

impl SecurityConfig {
    /// Origins effective for the given mode.
    pub fn origins_for(&self, mode: DeploymentMode) -> Vec<String> {
        if mode.is_production() {
            self.allowed_origins.clone()
        } else {
            vec![DEV_FRONTEND_ORIGIN.to_string()]
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            security_headers: true,
        }
    }
}

/// Origin of the frontend dev server.
pub const DEV_FRONTEND_ORIGIN: &str = "http://localhost:3000";
