//! Failure translation end to end: handler failure → log → envelope.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use reqapp_backend::config::DeploymentMode;
use reqapp_backend::http::ErrorEnvelope;

mod common;

use common::{app, get_request, json, send, LogCapture};

#[tokio::test]
async fn validation_error_surfaces_its_message() {
    let _logs = LogCapture::start();
    let (status, headers, body) =
        send(app(DeploymentMode::Development), get_request("/boom/validation")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let envelope: ErrorEnvelope = serde_json::from_slice(&body).unwrap();
    assert_eq!(envelope.error.message, "Feld X fehlt");
    assert_eq!(envelope.error.status_code, 400);
    assert_eq!(envelope.error.code.as_deref(), Some("VALIDATION_ERROR"));
    assert_eq!(envelope.error.path, "/boom/validation");
    assert_eq!(envelope.error.method, "GET");
    assert!(chrono::DateTime::parse_from_rfc3339(&envelope.error.timestamp).is_ok());
}

#[tokio::test]
async fn defect_is_generic_in_production() {
    let logs = LogCapture::start();
    let (status, _, body) =
        send(app(DeploymentMode::Production), get_request("/boom/defect")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(&body);
    assert_eq!(body["error"]["message"], "Internal server error");
    assert_eq!(body["error"]["statusCode"], 500);
    assert!(body["error"].get("stack").is_none());

    // The real message only reaches the log.
    let errors = logs.with_message("Application error");
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0]["fields"]["error.message"],
        "connection pool poisoned at 0xdeadbeef"
    );
}

#[tokio::test]
async fn defect_carries_stack_outside_production() {
    let _logs = LogCapture::start();
    let (status, _, body) =
        send(app(DeploymentMode::Development), get_request("/boom/defect")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(&body);
    assert_ne!(body["error"]["message"], "connection pool poisoned at 0xdeadbeef");
    let stack = body["error"]["stack"].as_str().unwrap();
    assert!(!stack.is_empty());
}

#[tokio::test]
async fn handler_panic_becomes_internal_error() {
    let logs = LogCapture::start();
    let (status, _, body) =
        send(app(DeploymentMode::Production), get_request("/boom/panic")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(&body)["error"]["message"], "Internal server error");

    let errors = logs.with_message("Application error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["fields"]["error.message"], "handler invariant broken");
    assert_eq!(errors[0]["fields"]["error.kind"], "InternalError");
}

#[tokio::test]
async fn database_failures_map_to_generic_conflict_and_not_found() {
    let _logs = LogCapture::start();

    let (status, _, body) =
        send(app(DeploymentMode::Production), get_request("/boom/duplicate")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let message = json(&body)["error"]["message"].as_str().unwrap().to_string();
    assert!(!message.contains("email"));

    let (status, _, body) =
        send(app(DeploymentMode::Production), get_request("/boom/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"]["message"], "Record not found");
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let _logs = LogCapture::start();
    let (status, _, body) =
        send(app(DeploymentMode::Production), get_request("/boom/token")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"]["message"], "Token expired");
    assert_eq!(json(&body)["error"]["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn malformed_json_body_is_rejected_through_the_pipeline() {
    let _logs = LogCapture::start();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();

    let (status, _, body) = send(app(DeploymentMode::Production), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"]["message"], "Invalid JSON format");
    assert_eq!(json(&body)["error"]["code"], "INVALID_JSON");
}

#[tokio::test]
async fn missing_content_type_is_a_validation_error() {
    let _logs = LogCapture::start();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .body(Body::from("{}"))
        .unwrap();

    let (status, _, body) = send(app(DeploymentMode::Production), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn valid_json_body_passes_untouched() {
    let logs = LogCapture::start();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\":\"Spec\"}"))
        .unwrap();

    let (status, _, body) = send(app(DeploymentMode::Production), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["title"], "Spec");
    assert!(logs.with_message("Application error").is_empty());
}

#[tokio::test]
async fn undefined_route_returns_not_found_envelope() {
    let logs = LogCapture::start();
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/does-not-exist")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(app(DeploymentMode::Production), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let body = json(&body);
    assert_eq!(body["error"]["path"], "/api/does-not-exist");
    assert_eq!(body["error"]["method"], "DELETE");
    assert_eq!(body["error"]["statusCode"], 404);
    assert!(body["error"].get("code").is_none());

    assert_eq!(logs.with_message("404 Not Found").len(), 1);
    assert!(logs.with_message("Application error").is_empty());
}

#[tokio::test]
async fn unsupported_method_on_known_path_gets_not_found_envelope() {
    let logs = LogCapture::start();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = send(app(DeploymentMode::Production), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );

    let envelope: ErrorEnvelope = serde_json::from_slice(&body).unwrap();
    assert_eq!(envelope.error.path, "/api/health");
    assert_eq!(envelope.error.method, "POST");
    assert_eq!(envelope.error.status_code, 404);
    assert_eq!(logs.with_message("404 Not Found").len(), 1);
}

#[tokio::test]
async fn error_is_logged_before_completion() {
    let logs = LogCapture::start();
    send(app(DeploymentMode::Production), get_request("/boom/validation")).await;

    let messages: Vec<String> = logs
        .records()
        .iter()
        .map(|record| record["fields"]["message"].as_str().unwrap_or_default().to_string())
        .collect();
    let error_at = messages
        .iter()
        .position(|m| m == "Application error")
        .unwrap();
    let completion_at = messages
        .iter()
        .position(|m| m.starts_with("GET /boom/validation - 400 - "))
        .unwrap();
    assert!(error_at < completion_at);
    assert_eq!(logs.completions().len(), 1);
}

#[tokio::test]
async fn caller_identity_survives_translation() {
    let logs = LogCapture::start();
    let (status, _, _) =
        send(app(DeploymentMode::Production), get_request("/boom/forbidden")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let errors = logs.with_message("Application error");
    assert_eq!(errors[0]["fields"]["context"]["userId"], "user-9");

    let completions = logs.completions();
    assert_eq!(completions[0]["fields"]["user_id"], "user-9");
}
