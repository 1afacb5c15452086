//! Operational error taxonomy.
//!
//! Call sites signal a failure kind without repeating status-code literals:
//!
//! ```
//! use reqapp_backend::error::{AppError, ErrorKind};
//!
//! let err = AppError::validation("Feld X fehlt");
//! assert_eq!(err.kind(), ErrorKind::Validation);
//! assert_eq!(err.status().as_u16(), 400);
//! assert!(err.is_operational());
//! ```

use axum::http::StatusCode;
use serde::Serialize;
use std::backtrace::{Backtrace, BacktraceStatus};
use thiserror::Error;

/// Closed set of failure kinds, each with a fixed HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    RateLimit,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        Self::Validation,
        Self::Unauthorized,
        Self::Forbidden,
        Self::NotFound,
        Self::Conflict,
        Self::RateLimit,
        Self::Unknown,
    ];

    pub fn status(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code carried in the error envelope.
    pub fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimit => "RATE_LIMITED",
            Self::Unknown => "INTERNAL_ERROR",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            Self::Validation => "Invalid input",
            Self::Unauthorized => "Not authenticated",
            Self::Forbidden => "Permission denied",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Conflicting resource state",
            Self::RateLimit => "Too many requests",
            Self::Unknown => "Internal server error",
        }
    }
}

/// Backtrace taken where an [`AppError`] was built.
///
/// Kept opaque so the error derive treats it as plain data.
#[derive(Debug)]
struct Trace(Backtrace);

/// An expected failure whose message is safe to show to clients.
///
/// Kinds with a default message have argument-free constructors; chain
/// [`with_message`](Self::with_message) to override it:
///
/// ```
/// use reqapp_backend::error::AppError;
///
/// let err = AppError::forbidden().with_message("Only owners may archive");
/// assert_eq!(err.message(), "Only owners may archive");
/// assert_eq!(err.status().as_u16(), 403);
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    trace: Trace,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            trace: Trace(Backtrace::capture()),
        }
    }

    /// Error of `kind` carrying the kind's default message.
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn unauthorized() -> Self {
        Self::from_kind(ErrorKind::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Self::from_kind(ErrorKind::Forbidden)
    }

    pub fn not_found() -> Self {
        Self::from_kind(ErrorKind::NotFound)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn rate_limited() -> Self {
        Self::from_kind(ErrorKind::RateLimit)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Replace the message, keeping kind and status. This is how the
    /// default-message constructors take a custom message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Always true: taxonomy errors describe expected conditions.
    pub fn is_operational(&self) -> bool {
        true
    }

    /// Rendered backtrace, when `RUST_BACKTRACE` enabled capture.
    pub fn stack(&self) -> Option<String> {
        let Trace(backtrace) = &self.trace;
        (backtrace.status() == BacktraceStatus::Captured).then(|| backtrace.to_string())
    }
}
