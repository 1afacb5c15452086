//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the built-in and caller-supplied routes
//! - Wire up middleware (request ID, observer, CORS, headers, limits, errors)
//! - Bind the server to a listener
//! - Drain in-flight requests on shutdown, bounded by the grace period

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    Router,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
};

use crate::config::{AppConfig, DeploymentMode};
use crate::http::middleware::{handle_errors, log_requests};
use crate::http::request::X_REQUEST_ID;
use crate::http::routes;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::logging::{Logger, Metadata};

const SECURITY_HEADERS: [(HeaderName, &str); 6] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
    (header::REFERRER_POLICY, "no-referrer"),
    (
        header::STRICT_TRANSPORT_SECURITY,
        "max-age=15552000; includeSubDomains",
    ),
    (header::X_DNS_PREFETCH_CONTROL, "off"),
    (
        HeaderName::from_static("cross-origin-opener-policy"),
        "same-origin",
    ),
];

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub logger: Logger,
    pub mode: DeploymentMode,
    pub slow_request_threshold: Duration,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(logger: Logger, config: &AppConfig) -> Self {
        Self {
            logger,
            mode: config.mode,
            slow_request_threshold: config.observability.slow_request_threshold(),
            started_at: Instant::now(),
        }
    }
}

/// HTTP server for the backend.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    logger: Logger,
}

impl HttpServer {
    /// Server with only the built-in routes.
    pub fn new(config: AppConfig, logger: Logger) -> Self {
        Self::with_routes(config, logger, Router::new())
    }

    /// Server with `routes` mounted next to the built-in ones, behind the
    /// full middleware stack.
    pub fn with_routes(config: AppConfig, logger: Logger, routes: Router<AppState>) -> Self {
        let state = AppState::new(logger.clone(), &config);
        let router = Self::build_router(&config, state, routes);
        Self {
            router,
            config,
            logger,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &AppConfig, state: AppState, routes: Router<AppState>) -> Router {
        let mut router = routes::api_routes()
            .merge(routes)
            .fallback(routes::not_found)
            .method_not_allowed_fallback(routes::not_found)
            .layer(from_fn_with_state(state.clone(), handle_errors))
            .layer(DefaultBodyLimit::max(config.server.body_limit_bytes));

        if config.security.security_headers {
            for (name, value) in SECURITY_HEADERS {
                router = router.layer(SetResponseHeaderLayer::if_not_present(
                    name,
                    HeaderValue::from_static(value),
                ));
            }
        }

        let request_id = HeaderName::from_static(X_REQUEST_ID);
        router
            .layer(cors_layer(config))
            .layer(from_fn_with_state(state.clone(), log_requests))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
            .with_state(state)
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires and in-flight requests drain.
    ///
    /// Connections still open when the grace period ends are abandoned.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let grace = self.config.server.shutdown_grace();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let drain = shutdown.clone();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let reason = drain.wait().await;
                tracing::info!(reason = %reason, "Shutdown signal received, draining");
            })
            .into_future();

        let deadline = async {
            shutdown.wait().await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            result = serve => result?,
            () = deadline => {
                self.logger.warn(
                    "Shutdown grace period elapsed, closing remaining connections",
                    &Metadata::new().with("graceSecs", grace.as_secs()),
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .origins_for(config.mode)
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(X_REQUEST_ID),
        ])
        .expose_headers([HeaderName::from_static(X_REQUEST_ID)])
}
