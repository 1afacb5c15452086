//! HTTP request pipeline.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, CORS, security headers)
//!     → middleware/request_logger.rs (timer, completion record)
//!     → middleware/error_handler.rs (panics + ApiError → envelope)
//!     → routes.rs / caller routes
//!     → response.rs (error envelope)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod routes;
pub mod server;

pub use request::{ApiJson, CallerIdentity, RequestContext, X_REQUEST_ID};
pub use response::{ErrorBody, ErrorEnvelope};
pub use server::{AppState, HttpServer};
