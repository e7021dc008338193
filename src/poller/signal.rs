//! Stop signal shared between the poll loop and its handle

use std::fmt;
use std::sync::OnceLock;

use log::info;
use tokio::sync::Notify;

/// Why the poll loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The exit tag read as 1
    ExitSentinel,
    /// Stopped through the handle (Ctrl-C)
    Cancelled,
    /// The configured tick limit was reached
    MaxTicks,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::ExitSentinel => write!(f, "exit tag set"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::MaxTicks => write!(f, "tick limit reached"),
        }
    }
}

/// One-shot stop flag. The first `stop` wins; later calls are no-ops.
#[derive(Debug, Default)]
pub struct StopSignal {
    reason: OnceLock<StopReason>,
    notify: Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the loop. Returns false if it was already stopped.
    pub fn stop(&self, reason: StopReason) -> bool {
        if self.reason.set(reason).is_err() {
            return false;
        }
        self.notify.notify_waiters();
        info!("Exited: {}", reason);
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.reason.get().is_some()
    }

    pub fn reason(&self) -> Option<StopReason> {
        self.reason.get().copied()
    }

    /// Resolves once `stop` has been called
    pub async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}
