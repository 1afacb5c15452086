//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Init logging → Bind listener → Announce
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     First reason wins → Stop accepting → Drain (bounded) → Exit code
//! ```
//!
//! # Design Decisions
//! - Fail fast: a bind failure is fatal
//! - Listener binds last, after logging is up
//! - Shutdown has timeout: remaining connections abandoned after the grace period
//! - A panic outside any request is a fatal shutdown reason

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownReason};
