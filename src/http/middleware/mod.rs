//! Request pipeline middleware.
//!
//! Order, outermost first: request id, request observer, CORS, security
//! headers, body limit, error translator, routes.

pub mod error_handler;
pub mod request_logger;

pub use error_handler::handle_errors;
pub use request_logger::{log_requests, RequestLogEntry};
