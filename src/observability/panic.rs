//! Panic capture.
//!
//! Panics are the Rust counterpart of uncaught defects. Three cases:
//! - inside a request, wrapped by [`catch_panics`]: the hook only stashes the
//!   backtrace and the error translator logs and answers the request;
//! - inside a spawned tokio task: the runtime catches the panic and hands it
//!   to whoever awaits the `JoinHandle`, so the hook logs it and moves on;
//! - on a plain thread or the main task: the hook logs the panic and reports
//!   it as fatal so the process shuts down instead of running on in a
//!   corrupted state.

use futures_util::FutureExt;
use std::any::Any;
use std::backtrace::Backtrace;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};

use crate::observability::logging::{ErrorReport, Logger, Metadata};

tokio::task_local! {
    static PANIC_TRACE: Arc<OnceLock<String>>;
}

/// A panic caught while polling a future.
#[derive(Debug, Clone)]
pub struct CaughtPanic {
    pub message: String,
    pub stack: String,
}

/// Poll `future` to completion, converting a panic into [`CaughtPanic`].
///
/// The backtrace is taken at the panic site when the hook from
/// [`install_panic_hook`] is active, otherwise at the catch site.
pub async fn catch_panics<F>(future: F) -> Result<F::Output, CaughtPanic>
where
    F: Future,
{
    let trace = Arc::new(OnceLock::new());
    let outcome = PANIC_TRACE
        .scope(trace.clone(), AssertUnwindSafe(future).catch_unwind())
        .await;

    outcome.map_err(|payload| CaughtPanic {
        message: panic_message(payload.as_ref()),
        stack: trace
            .get()
            .cloned()
            .unwrap_or_else(|| Backtrace::force_capture().to_string()),
    })
}

/// Install the process-wide panic hook. Call once, from `main`.
///
/// `on_fatal` runs after a panic outside any request and outside any tokio
/// task has been logged.
pub fn install_panic_hook<F>(logger: Logger, on_fatal: F)
where
    F: Fn() + Send + Sync + 'static,
{
    std::panic::set_hook(Box::new(move |info| {
        let stack = Backtrace::force_capture().to_string();

        let in_request = PANIC_TRACE
            .try_with(|slot| {
                let _ = slot.set(stack.clone());
            })
            .is_ok();
        if in_request {
            return;
        }

        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
        let thread = std::thread::current().name().map(str::to_owned);
        let metadata = Metadata::new()
            .with("location", location)
            .with("thread", thread);

        // The runtime turns a task panic into a JoinError for its awaiter.
        if let Some(task) = tokio::task::try_id() {
            logger.log_error(
                &ErrorReport {
                    message: panic_message(info.payload()),
                    kind: "TaskPanic",
                    stack: Some(stack),
                },
                &metadata.with("task", task.to_string()),
            );
            return;
        }

        logger.log_error(
            &ErrorReport {
                message: panic_message(info.payload()),
                kind: "UncaughtPanic",
                stack: Some(stack),
            },
            &metadata,
        );
        on_fatal();
    }));
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
