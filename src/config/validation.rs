//! Configuration validation.
//!
//! Serde handles syntax; this pass checks value ranges and cross-field
//! rules. It returns every problem found, not just the first.

use axum::http::HeaderValue;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in an otherwise well-formed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::new("server.host", "must not be empty"));
    }
    if config.server.body_limit_bytes == 0 {
        errors.push(ValidationError::new("server.body_limit_bytes", "must be greater than 0"));
    }
    if config.server.shutdown_grace_secs == 0 {
        errors.push(ValidationError::new("server.shutdown_grace_secs", "must be greater than 0"));
    }

    if config.logging.service_name.trim().is_empty() {
        errors.push(ValidationError::new("logging.service_name", "must not be empty"));
    }
    if config.logging.max_files < 2 {
        errors.push(ValidationError::new(
            "logging.max_files",
            "must retain the active file and at least one archive",
        ));
    }
    if config.logging.max_file_bytes < 1024 {
        errors.push(ValidationError::new("logging.max_file_bytes", "must be at least 1024"));
    }
    if config.mode.is_production() && config.logging.directory.trim().is_empty() {
        errors.push(ValidationError::new(
            "logging.directory",
            "required in production for the file sinks",
        ));
    }

    if config.observability.slow_request_ms == 0 {
        errors.push(ValidationError::new("observability.slow_request_ms", "must be greater than 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    for origin in &config.security.allowed_origins {
        if HeaderValue::from_str(origin).is_err() || !origin.starts_with("http") {
            errors.push(ValidationError::new(
                "security.allowed_origins",
                format!("'{origin}' is not a valid origin"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
