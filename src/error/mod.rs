//! Error model of the request pipeline.
//!
//! Every failure that can end a request is an [`ApiError`]: a closed enum
//! over the taxonomy ([`AppError`]), the collaborator shapes
//! ([`collaborators`]) and unclassified defects. Handlers return
//! `Result<_, ApiError>` and use `?`; the error-handling middleware turns the
//! error into the JSON envelope.

pub mod collaborators;
pub mod taxonomy;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::observability::logging::ErrorReport;
use crate::observability::panic::CaughtPanic;

pub use collaborators::{DatabaseError, DatabaseErrorKind, TokenError, ValidationFailure};
pub use taxonomy::{AppError, ErrorKind};

pub type ApiResult<T> = Result<T, ApiError>;

/// An unexpected failure. Its message never reaches clients.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct Defect {
    message: String,
    stack: String,
}

impl Defect {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: Backtrace::force_capture().to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }
}

impl From<CaughtPanic> for Defect {
    fn from(panic: CaughtPanic) -> Self {
        Self {
            message: panic.message,
            stack: panic.stack,
        }
    }
}

/// Any failure that can end a request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Internal(#[from] Defect),
}

/// Client-facing outcome of a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: StatusCode,
    pub message: String,
    pub code: &'static str,
    pub details: Option<Value>,
    pub operational: bool,
}

impl Classification {
    fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            details: None,
            operational: true,
        }
    }
}

impl ApiError {
    /// Wrap any displayable failure as an unclassified defect.
    pub fn internal(error: impl fmt::Display) -> Self {
        Self::Internal(Defect::new(error.to_string()))
    }

    /// Map the failure to status, client message and code.
    pub fn classify(&self) -> Classification {
        match self {
            Self::App(err) => Classification {
                status: err.status(),
                message: err.message().to_string(),
                code: err.kind().code(),
                details: None,
                operational: err.is_operational(),
            },
            Self::Database(err) => match err.kind() {
                DatabaseErrorKind::UniqueViolation => Classification::new(
                    StatusCode::CONFLICT,
                    "Data conflict: record already exists",
                    "CONFLICT",
                ),
                DatabaseErrorKind::RecordNotFound => {
                    Classification::new(StatusCode::NOT_FOUND, "Record not found", "NOT_FOUND")
                }
                DatabaseErrorKind::Other => Classification {
                    details: Some(json!({ "code": err.code() })),
                    operational: false,
                    ..Classification::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Database error",
                        "DATABASE_ERROR",
                    )
                },
            },
            Self::Token(TokenError::Malformed(_)) => {
                Classification::new(StatusCode::UNAUTHORIZED, "Invalid token", "INVALID_TOKEN")
            }
            Self::Token(TokenError::Expired) => {
                Classification::new(StatusCode::UNAUTHORIZED, "Token expired", "TOKEN_EXPIRED")
            }
            Self::Validation(failure) => Classification {
                details: failure.details.clone(),
                ..Classification::new(
                    StatusCode::BAD_REQUEST,
                    failure.message.clone(),
                    ErrorKind::Validation.code(),
                )
            },
            Self::MalformedBody(_) => {
                Classification::new(StatusCode::BAD_REQUEST, "Invalid JSON format", "INVALID_JSON")
            }
            Self::Internal(_) => Classification {
                operational: false,
                ..Classification::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorKind::Unknown.default_message(),
                    ErrorKind::Unknown.code(),
                )
            },
        }
    }

    /// Variant name as recorded in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::App(_) => "AppError",
            Self::Database(_) => "DatabaseError",
            Self::Token(TokenError::Malformed(_)) => "InvalidTokenError",
            Self::Token(TokenError::Expired) => "TokenExpiredError",
            Self::Validation(_) => "ValidationError",
            Self::MalformedBody(_) => "SyntaxError",
            Self::Internal(_) => "InternalError",
        }
    }

    pub fn stack(&self) -> Option<String> {
        match self {
            Self::App(err) => err.stack(),
            Self::Internal(defect) => Some(defect.stack().to_string()),
            _ => None,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            message: self.to_string(),
            kind: self.name(),
            stack: self.stack(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonSyntaxError(err) => Self::MalformedBody(err.body_text()),
            JsonRejection::JsonDataError(err) => {
                Self::Validation(ValidationFailure::new(err.body_text()))
            }
            JsonRejection::MissingJsonContentType(err) => {
                Self::Validation(ValidationFailure::new(err.body_text()))
            }
            other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => Self::Validation(
                ValidationFailure::new("Request body exceeds the configured limit"),
            ),
            other => Self::MalformedBody(other.body_text()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Syntax | Category::Eof => Self::MalformedBody(err.to_string()),
            Category::Data => Self::Validation(ValidationFailure::new(err.to_string())),
            Category::Io => Self::internal(err),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

/// Failure waiting in response extensions for the error-handling middleware.
#[derive(Debug, Clone)]
pub(crate) struct PendingFailure(pub(crate) Arc<ApiError>);

impl IntoResponse for ApiError {
    /// Produces a bodiless placeholder with the right status; the
    /// error-handling middleware replaces it with the envelope.
    fn into_response(self) -> Response {
        let mut response = self.classify().status.into_response();
        response
            .extensions_mut()
            .insert(PendingFailure(Arc::new(self)));
        response
    }
}
