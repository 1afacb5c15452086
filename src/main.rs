//! ReqApp backend.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ request id ─▶ observer ─▶ cors/headers ─▶ error translator ─▶ routes
//!                                     │                              │
//!                                     ▼                              ▼
//!                              completion record              error record + envelope
//!                                     │                              │
//!                                     └──────────▶ Logger ◀──────────┘
//!                                               console / rotating files
//!
//!     SIGINT/SIGTERM/fatal panic ─▶ Shutdown ─▶ drain (bounded) ─▶ exit code
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use reqapp_backend::config::{load_config_with, AppConfig, DeploymentMode};
use reqapp_backend::http::HttpServer;
use reqapp_backend::lifecycle::{
    signals::spawn_signal_listener,
    startup::{announce, bind_listener},
    Shutdown, ShutdownReason,
};
use reqapp_backend::observability::{
    init_logging, metrics::init_metrics, panic::install_panic_hook, ErrorReport, Logger, Metadata,
};

#[derive(Parser)]
#[command(name = "reqapp-backend")]
#[command(about = "ReqApp HTTP backend", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overrides the config file and PORT.
    #[arg(short, long)]
    port: Option<u16>,

    /// Deployment mode: development, production or test.
    #[arg(short, long)]
    mode: Option<DeploymentMode>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let overrides = |config: &mut AppConfig| {
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(mode) = cli.mode {
            config.mode = mode;
        }
    };
    let config = match load_config_with(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let _logging = match init_logging(config.mode, &config.logging) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Failed to initialize logging: {err}");
            return ExitCode::FAILURE;
        }
    };
    let logger = Logger::from_config(&config.logging);

    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        install_panic_hook(logger.clone(), move || {
            shutdown.trigger(ShutdownReason::Fatal);
        });
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(err) = init_metrics(addr) {
                    logger.log_error(
                        &ErrorReport::from_error(&err),
                        &Metadata::new().with("phase", "metrics"),
                    );
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = match bind_listener(&config.server).await {
        Ok(listener) => listener,
        Err(err) => {
            logger.log_error(
                &ErrorReport::from_error(&err),
                &Metadata::new().with("phase", "startup"),
            );
            return ExitCode::FAILURE;
        }
    };
    let local_addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(err) => {
            logger.log_error(
                &ErrorReport::from_error(&err),
                &Metadata::new().with("phase", "startup"),
            );
            return ExitCode::FAILURE;
        }
    };

    announce(&logger, local_addr, &config);
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config, logger.clone());
    if let Err(err) = server.run(listener, shutdown.clone()).await {
        logger.log_error(
            &ErrorReport::from_error(&err),
            &Metadata::new().with("phase", "serve"),
        );
        shutdown.trigger(ShutdownReason::Fatal);
    }

    let reason = shutdown.reason().unwrap_or(ShutdownReason::Fatal);
    logger.info(
        "Shutdown complete",
        &Metadata::new().with("reason", reason.as_str()),
    );
    logger.audit(
        "server.shutdown",
        None,
        &Metadata::new().with("reason", reason.as_str()),
    );

    ExitCode::from(reason.exit_status())
}
