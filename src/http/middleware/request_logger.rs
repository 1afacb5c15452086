//! Request observer middleware.
//!
//! # Data Flow
//! ```text
//! request enters
//!     → timer starts (tokio clock), debug "HTTP request start" in development
//!     → inner layers produce the response
//!     → body wrapped in ObservedBody
//!     → body dropped (fully sent, aborted or never polled)
//!     → one completion record (+ "Slow request" warning, metrics)
//! ```
//!
//! # Design Decisions
//! - Completion is tied to the body's drop, so it fires exactly once on
//!   every path, streaming or not
//! - Status >= 400 logs at error level, everything else at info

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use serde::Serialize;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;

use crate::http::request::{CallerIdentity, RequestContext, ANONYMOUS};
use crate::http::server::AppState;
use crate::observability::logging::{emit, LogLevel, Logger, Metadata};
use crate::observability::metrics;

pub async fn log_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let context = RequestContext::capture(&request);

    if state.mode.is_development() {
        state.logger.debug(
            "HTTP request start",
            &Metadata::new()
                .with("method", context.method.as_str())
                .with("url", context.url.as_str())
                .with("ip", context.client_ip())
                .with("userAgent", context.user_agent.clone()),
        );
    }

    let response = next.run(request).await;

    let user_id = response
        .extensions()
        .get::<CallerIdentity>()
        .map_or_else(|| context.user_id().to_string(), |caller| caller.0.clone());

    let (parts, body) = response.into_parts();
    let entry = RequestLogEntry {
        method: context.method.to_string(),
        url: context.url.clone(),
        status_code: parts.status.as_u16(),
        duration_ms: 0,
        user_id,
        user_agent: context.user_agent.clone(),
        ip: context.client_ip(),
        referer: context.referer.clone(),
        content_length: body.size_hint().exact(),
        request_id: context.request_id.clone(),
    };

    let completion = Completion {
        entry,
        started,
        slow_threshold: state.slow_request_threshold,
        logger: state.logger.clone(),
    };

    Response::from_parts(
        parts,
        Body::new(ObservedBody {
            inner: body,
            _completion: completion,
        }),
    )
}

/// One line per completed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogEntry {
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub duration_ms: u64,
    pub user_id: String,
    pub user_agent: Option<String>,
    pub ip: String,
    pub referer: Option<String>,
    pub content_length: Option<u64>,
    pub request_id: Option<String>,
}

impl RequestLogEntry {
    pub fn summary(&self) -> String {
        format!(
            "{} {} - {} - {}ms",
            self.method, self.url, self.status_code, self.duration_ms
        )
    }

    pub fn level(&self) -> LogLevel {
        if self.status_code >= 400 {
            LogLevel::Error
        } else {
            LogLevel::Info
        }
    }

    fn emit(&self, logger: &Logger, level: LogLevel, message: &str, warning: Option<&str>) {
        emit!(
            level,
            service = logger.service(),
            method = %self.method,
            url = %self.url,
            status_code = self.status_code,
            duration_ms = self.duration_ms,
            user_id = %self.user_id,
            user_agent = self.user_agent.as_deref(),
            ip = %self.ip,
            referer = self.referer.as_deref(),
            content_length = self.content_length,
            request_id = self.request_id.as_deref(),
            warning,
            "{}",
            message
        );
    }
}

impl Default for RequestLogEntry {
    fn default() -> Self {
        Self {
            method: String::new(),
            url: String::new(),
            status_code: 0,
            duration_ms: 0,
            user_id: ANONYMOUS.to_string(),
            user_agent: None,
            ip: "unknown".to_string(),
            referer: None,
            content_length: None,
            request_id: None,
        }
    }
}

/// Emits the completion records when dropped.
struct Completion {
    entry: RequestLogEntry,
    started: Instant,
    slow_threshold: Duration,
    logger: Logger,
}

impl Drop for Completion {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        self.entry.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        let summary = self.entry.summary();
        self.entry
            .emit(&self.logger, self.entry.level(), &summary, None);

        if elapsed > self.slow_threshold {
            let warning = format!(
                "Request took longer than {}ms",
                self.slow_threshold.as_millis()
            );
            self.entry
                .emit(&self.logger, LogLevel::Warn, "Slow request", Some(&warning));
        }

        metrics::record_request(&self.entry.method, self.entry.status_code, elapsed);
    }
}

/// Response body that reports completion when dropped.
struct ObservedBody {
    inner: Body,
    _completion: Completion,
}

impl HttpBody for ObservedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_matches_access_log_format() {
        let entry = RequestLogEntry {
            method: "GET".into(),
            url: "/api/health".into(),
            status_code: 200,
            duration_ms: 12,
            ..RequestLogEntry::default()
        };
        assert_eq!(entry.summary(), "GET /api/health - 200 - 12ms");
    }

    #[test]
    fn client_and_server_errors_log_at_error_level() {
        let mut entry = RequestLogEntry {
            status_code: 399,
            ..RequestLogEntry::default()
        };
        assert_eq!(entry.level(), LogLevel::Info);
        entry.status_code = 400;
        assert_eq!(entry.level(), LogLevel::Error);
        entry.status_code = 503;
        assert_eq!(entry.level(), LogLevel::Error);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(RequestLogEntry::default()).unwrap();
        assert_eq!(json["userId"], "anonymous");
        assert!(json.get("statusCode").is_some());
        assert!(json.get("durationMs").is_some());
    }
}
