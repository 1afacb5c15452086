//! Error response envelope.
//!
//! Every failed request is answered with exactly one of these, as
//! `application/json`:
//!
//! ```text
//! { "error": { "message", "code"?, "statusCode", "timestamp",
//!              "path", "method", "details"?, "stack"? } }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Classification;
use crate::http::request::RequestContext;
use crate::observability::logging::iso_timestamp;

/// Client message for unmatched routes.
pub const ROUTE_NOT_FOUND: &str = "Route not found";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub status_code: u16,
    pub timestamp: String,
    pub path: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorEnvelope {
    pub fn from_classification(classification: &Classification, context: &RequestContext) -> Self {
        Self {
            error: ErrorBody {
                message: classification.message.clone(),
                code: Some(classification.code.to_string()),
                status_code: classification.status.as_u16(),
                timestamp: iso_timestamp(),
                path: context.url.clone(),
                method: context.method.to_string(),
                details: classification.details.clone(),
                stack: None,
            },
        }
    }

    /// Envelope for a request no route matched.
    pub fn not_found(context: &RequestContext) -> Self {
        Self {
            error: ErrorBody {
                message: ROUTE_NOT_FOUND.to_string(),
                code: None,
                status_code: StatusCode::NOT_FOUND.as_u16(),
                timestamp: iso_timestamp(),
                path: context.url.clone(),
                method: context.method.to_string(),
                details: None,
                stack: None,
            },
        }
    }

    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.error.stack = stack;
        self
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
