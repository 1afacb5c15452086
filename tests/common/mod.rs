//! Shared utilities for integration tests.
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use reqapp_backend::config::{AppConfig, DeploymentMode};
use reqapp_backend::error::{ApiError, ApiResult, AppError, DatabaseError, TokenError};
use reqapp_backend::http::{ApiJson, AppState, CallerIdentity, HttpServer};
use reqapp_backend::observability::format::StructuredJson;
use reqapp_backend::observability::Logger;
use serde_json::Value;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use tracing::subscriber::DefaultGuard;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter(Arc::clone(&self.0))
    }
}

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "lock poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// JSON log capture for the current thread, in the production layout.
/// Use with the default current-thread `#[tokio::test]` runtime.
pub struct LogCapture {
    buffer: SharedBuffer,
    _guard: DefaultGuard,
}

impl LogCapture {
    pub fn start() -> Self {
        let buffer = SharedBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .event_format(StructuredJson)
            .with_max_level(Level::DEBUG)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        Self {
            buffer,
            _guard: guard,
        }
    }

    /// Every record emitted so far, in order.
    pub fn records(&self) -> Vec<Value> {
        let bytes = self.buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    pub fn with_message(&self, message: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|record| record["fields"]["message"] == message)
            .collect()
    }

    /// Request completion records: the ones carrying a status code, minus
    /// slow-request warnings.
    pub fn completions(&self) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|record| {
                record["fields"].get("status_code").is_some()
                    && record["fields"]["message"] != "Slow request"
            })
            .collect()
    }
}

pub fn config(mode: DeploymentMode) -> AppConfig {
    let mut config = AppConfig::default();
    config.mode = mode;
    config.server.host = "127.0.0.1".into();
    config.server.port = 0;
    config
}

pub fn logger() -> Logger {
    Logger::new("reqapp-test")
}

/// Fully layered router with the test routes mounted.
pub fn app(mode: DeploymentMode) -> Router {
    HttpServer::with_routes(config(mode), logger(), test_routes()).router()
}

pub fn test_routes() -> Router<AppState> {
    Router::new()
        .route("/boom/validation", get(validation_failure))
        .route("/boom/defect", get(defect))
        .route("/boom/panic", get(panics))
        .route("/boom/duplicate", get(duplicate_key))
        .route("/boom/missing", get(missing_record))
        .route("/boom/token", get(expired_token))
        .route("/boom/forbidden", get(forbidden_for_caller))
        .route("/echo", post(echo))
        .route("/slow", get(slow))
        .route("/whoami", get(whoami))
}

async fn validation_failure() -> ApiResult<Json<Value>> {
    Err(AppError::validation("Feld X fehlt").into())
}

async fn defect() -> ApiResult<Json<Value>> {
    Err(ApiError::internal("connection pool poisoned at 0xdeadbeef"))
}

async fn panics() -> &'static str {
    let items: Vec<u8> = Vec::new();
    if items.is_empty() {
        panic!("handler invariant broken");
    }
    "unreachable"
}

async fn duplicate_key() -> ApiResult<Json<Value>> {
    Err(DatabaseError::from_code("P2002", "Unique constraint failed on the fields: (`email`)").into())
}

async fn missing_record() -> ApiResult<Json<Value>> {
    Err(DatabaseError::from_code("P2025", "No Project found").into())
}

async fn expired_token() -> ApiResult<Json<Value>> {
    Err(TokenError::Expired.into())
}

async fn forbidden_for_caller() -> impl IntoResponse {
    (
        Extension(CallerIdentity("user-9".into())),
        ApiError::from(AppError::forbidden()),
    )
}

async fn echo(ApiJson(body): ApiJson<Value>) -> Json<Value> {
    Json(body)
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_millis(1100)).await;
    "done"
}

async fn whoami() -> impl IntoResponse {
    (Extension(CallerIdentity("user-7".into())), "ok")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Send `request` through `router` and collect the whole body, which
/// completes the request.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body)
}

pub fn json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap()
}
