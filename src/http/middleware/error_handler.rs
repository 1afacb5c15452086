//! Error translator middleware.
//!
//! Sits directly around the routes. A handler failure arrives either as a
//! response carrying a [`PendingFailure`] (any `Err(ApiError)` or extractor
//! rejection) or as a panic. Both end here: logged once, answered once with
//! an [`ErrorEnvelope`].

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{ApiError, Defect, PendingFailure};
use crate::http::request::{CallerIdentity, RequestContext};
use crate::http::response::ErrorEnvelope;
use crate::http::server::AppState;
use crate::observability::panic::catch_panics;

pub async fn handle_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut context = RequestContext::capture(&request);

    let mut response = match catch_panics(next.run(request)).await {
        Ok(response) => response,
        Err(panic) => {
            let failure = ApiError::Internal(Defect::from(panic));
            return translate(&state, &failure, &context);
        }
    };

    let Some(PendingFailure(failure)) = response.extensions_mut().remove::<PendingFailure>() else {
        return response;
    };

    // An auth layer below us may have identified the caller before failing.
    let caller = response.extensions().get::<CallerIdentity>().cloned();
    if let Some(caller) = &caller {
        context.caller = Some(caller.clone());
    }

    let mut translated = translate(&state, &failure, &context);
    if let Some(caller) = caller {
        translated.extensions_mut().insert(caller);
    }
    translated
}

/// Log `failure` and build its envelope response.
pub fn translate(state: &AppState, failure: &ApiError, context: &RequestContext) -> Response {
    state.logger.log_error(&failure.report(), &context.to_metadata());

    let classification = failure.classify();
    let stack = state
        .mode
        .exposes_stack_traces()
        .then(|| failure.stack())
        .flatten();

    ErrorEnvelope::from_classification(&classification, context)
        .with_stack(stack)
        .into_response()
}
