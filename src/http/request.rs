//! Request-side plumbing.
//!
//! # Responsibilities
//! - Capture the per-request context used by logs and error envelopes
//! - Carry the authenticated caller, when an auth layer provides one
//! - Route JSON body failures into the error pipeline ([`ApiJson`])
//!
//! # Design Decisions
//! - Request ID is assigned by `tower-http` as the outermost layer
//! - The request body is never captured for logging

use axum::extract::{
    ConnectInfo, FromRequest, FromRequestParts, MatchedPath, OriginalUri, Request,
};
use axum::http::{header, request::Parts, Extensions, HeaderMap, Method, Uri};
use axum::Json;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::error::ApiError;
use crate::observability::logging::Metadata;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Caller identity recorded in request logs when no caller is known.
pub const ANONYMOUS: &str = "anonymous";

/// Authenticated caller, inserted into request or response extensions by
/// an authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

/// Everything the pipeline logs about a request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Original URL: path plus query string.
    pub url: String,
    pub query: Option<String>,
    /// Route template that matched, e.g. `/api/projects/{id}`.
    pub route: Option<String>,
    pub client_addr: Option<SocketAddr>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub caller: Option<CallerIdentity>,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn capture<B>(request: &axum::http::Request<B>) -> Self {
        Self::from_http(
            request.method(),
            request.uri(),
            request.headers(),
            request.extensions(),
        )
    }

    fn from_http(method: &Method, uri: &Uri, headers: &HeaderMap, extensions: &Extensions) -> Self {
        let uri = extensions.get::<OriginalUri>().map_or(uri, |original| &original.0);
        let url = uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());

        Self {
            method: method.clone(),
            url,
            query: uri.query().map(str::to_owned),
            route: extensions
                .get::<MatchedPath>()
                .map(|path| path.as_str().to_owned()),
            client_addr: extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0),
            user_agent: header_text(headers, header::USER_AGENT.as_str()),
            referer: header_text(headers, header::REFERER.as_str()),
            caller: extensions.get::<CallerIdentity>().cloned(),
            request_id: header_text(headers, X_REQUEST_ID),
        }
    }

    /// Client IP, or `unknown` when the connection info is unavailable.
    pub fn client_ip(&self) -> String {
        self.client_addr
            .map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string())
    }

    pub fn user_id(&self) -> &str {
        self.caller.as_ref().map_or(ANONYMOUS, |caller| caller.0.as_str())
    }

    pub fn to_metadata(&self) -> Metadata {
        Metadata::new()
            .with("url", self.url.as_str())
            .with("method", self.method.as_str())
            .with("ip", self.client_ip())
            .with("userAgent", self.user_agent.clone())
            .with("userId", self.caller.as_ref().map(|caller| caller.0.clone()))
            .with("route", self.route.clone())
            .with("query", self.query.clone())
            .with("requestId", self.request_id.clone())
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_http(
            &parts.method,
            &parts.uri,
            &parts.headers,
            &parts.extensions,
        ))
    }
}

/// JSON body extractor whose rejections go through the error pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(Self(value))
    }
}
