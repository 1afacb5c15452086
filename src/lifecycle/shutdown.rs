//! Shutdown coordination.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Why the process is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// A panic outside any request.
    Fatal,
}

impl ShutdownReason {
    /// Process exit status for this reason.
    pub fn exit_status(self) -> u8 {
        match self {
            Self::Interrupt | Self::Terminate => 0,
            Self::Fatal => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Fatal => "fatal error",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinator for graceful shutdown.
///
/// Cheap to clone. The first triggered reason is kept; later triggers are
/// ignored.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> watch::Receiver<Option<ShutdownReason>> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown. Returns `false` when a reason was already set.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.tx.borrow()
    }

    /// Resolve once a reason has been triggered.
    pub async fn wait(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        let reason = match rx.wait_for(Option::is_some).await {
            Ok(reason) => *reason,
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => None,
        };
        reason.unwrap_or(ShutdownReason::Terminate)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
