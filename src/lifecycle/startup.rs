//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the listener
//! - Announce the running server (port, health URL, mode, audit record)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{AppConfig, ServerConfig};
use crate::http::routes::HEALTH_PATH;
use crate::observability::logging::{Logger, Metadata};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Bind `host:port` from the server config.
pub async fn bind_listener(config: &ServerConfig) -> Result<TcpListener, StartupError> {
    let address = config.bind_address();
    TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}

/// Log that the server is up and record the start in the audit trail.
pub fn announce(logger: &Logger, addr: SocketAddr, config: &AppConfig) {
    let port = addr.port();
    let health_url = format!("http://localhost:{port}{HEALTH_PATH}");
    let none = Metadata::new();

    logger.info(&format!("ReqApp backend listening on port {port}"), &none);
    logger.info(&format!("Health check: {health_url}"), &none);
    logger.info(&format!("Environment: {}", config.mode), &none);

    logger.audit(
        "server.start",
        None,
        &Metadata::new()
            .with("port", port)
            .with("address", addr.to_string())
            .with("mode", config.mode.as_str()),
    );
}
