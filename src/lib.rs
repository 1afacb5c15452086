//! ReqApp backend request pipeline.
//!
//! Error taxonomy and translation, request observability, structured
//! logging and process lifecycle for the ReqApp HTTP backend.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult, AppError, ErrorKind};
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownReason};
pub use observability::Logger;
