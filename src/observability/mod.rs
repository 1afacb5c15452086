//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request pipeline, lifecycle, panic hook:
//!     → logging.rs (Logger handle → tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Sinks:
//!     → console (compact in development, JSON in production)
//!     → rotation.rs (error.log + combined.log, production only)
//!     JSON layout: format.rs
//! ```
//!
//! # Design Decisions
//! - One subscriber per process, installed in main
//! - The Logger handle is injected, never looked up globally
//! - Sink failures are reported on stderr and never propagate

pub mod format;
pub mod logging;
pub mod metrics;
pub mod panic;
pub mod rotation;

pub use logging::{init_logging, ErrorReport, LogLevel, Logger, LoggingGuard, Metadata};
