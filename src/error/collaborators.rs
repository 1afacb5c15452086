//! Failure shapes of external collaborators.
//!
//! Each collaborator (persistence, token verification, input validation)
//! reports failures through one of these types. They convert into
//! [`ApiError`](super::ApiError) at the boundary, so the translator never has
//! to sniff foreign error shapes.

use serde_json::Value;
use thiserror::Error;

/// Codes the persistence layer uses for duplicate keys.
///
/// `P2002` is the ORM code, `23505` the PostgreSQL SQLSTATE.
pub const UNIQUE_VIOLATION_CODES: &[&str] = &["P2002", "23505"];

/// Codes the persistence layer uses for a missing record.
pub const RECORD_NOT_FOUND_CODES: &[&str] = &["P2025"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseErrorKind {
    UniqueViolation,
    RecordNotFound,
    Other,
}

/// A failure reported by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("database error {code}: {message}")]
pub struct DatabaseError {
    kind: DatabaseErrorKind,
    code: String,
    message: String,
}

impl DatabaseError {
    /// Classify a driver error code.
    ///
    /// Checked in priority order: duplicate key, missing record, anything
    /// else.
    pub fn from_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let kind = if UNIQUE_VIOLATION_CODES.contains(&code.as_str()) {
            DatabaseErrorKind::UniqueViolation
        } else if RECORD_NOT_FOUND_CODES.contains(&code.as_str()) {
            DatabaseErrorKind::RecordNotFound
        } else {
            DatabaseErrorKind::Other
        };
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DatabaseErrorKind {
        self.kind
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A bearer token that could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,
}

/// Structured input validation failure raised outside the taxonomy, e.g. by
/// a schema validator.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationFailure {
    pub message: String,
    pub details: Option<Value>,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}
