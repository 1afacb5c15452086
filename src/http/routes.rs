//! Built-in routes.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::http::request::RequestContext;
use crate::http::response::ErrorEnvelope;
use crate::http::server::AppState;
use crate::observability::logging::iso_timestamp;

pub const HEALTH_PATH: &str = "/api/health";

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route("/api", get(api_index))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": iso_timestamp(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "version": state.logger.version(),
    }))
}

async fn api_index() -> Json<Value> {
    Json(json!({
        "message": "ReqApp API v1.0",
        "status": "active",
        "documentation": "/api/docs",
    }))
}

/// Fallback for unmatched routes and for known paths called with an
/// unsupported method. Answers directly, without the translator.
pub async fn not_found(State(state): State<AppState>, context: RequestContext) -> Response {
    state.logger.warn("404 Not Found", &context.to_metadata());
    ErrorEnvelope::not_found(&context).into_response()
}
