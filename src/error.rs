//! Error types returned by the bus.
//!
//! [`BusError`] covers every failure the bus surfaces to its callers:
//!
//! - [`BusError::Closed`] — subscribe/publish attempted after shutdown began.
//! - [`BusError::AlreadyClosing`] — shutdown requested twice.
//! - [`BusError::ShutdownTimeout`] — shutdown deadline elapsed before all workers drained.
//! - [`BusError::NoRuntime`] — subscribe attempted outside a Tokio runtime.
//!
//! Each variant provides helper methods (`as_label`, `as_message`) for logging.
//! Handler failures never show up here: they are contained inside the owning worker.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the bus.
///
/// Nothing is retried internally; every error is returned synchronously to
/// the caller that triggered it.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bus is shutting down; no new subscriptions or publications are accepted.
    #[error("bus is closing")]
    Closed,

    /// `close` was already invoked on this bus.
    #[error("bus is already closing")]
    AlreadyClosing,

    /// Shutdown deadline elapsed while some workers were still draining.
    ///
    /// The remaining workers are **not** cancelled; they keep draining in the background.
    #[error("shutdown deadline {grace:?} exceeded; {pending} worker(s) still draining")]
    ShutdownTimeout {
        /// Time the coordinator waited before giving up.
        grace: Duration,
        /// Number of workers that had not stopped when the deadline hit.
        pending: usize,
    },

    /// Subscribing needs a Tokio runtime to start the subscriber's worker.
    #[error("no Tokio runtime available to run the subscriber")]
    NoRuntime,
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use subpub::BusError;
    ///
    /// assert_eq!(BusError::Closed.as_label(), "bus_closed");
    /// assert_eq!(BusError::AlreadyClosing.as_label(), "bus_already_closing");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::Closed => "bus_closed",
            BusError::AlreadyClosing => "bus_already_closing",
            BusError::ShutdownTimeout { .. } => "bus_shutdown_timeout",
            BusError::NoRuntime => "bus_no_runtime",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::Closed => "bus is closing; call rejected".to_string(),
            BusError::AlreadyClosing => "close called more than once".to_string(),
            BusError::ShutdownTimeout { grace, pending } => {
                format!("gave up after {grace:?}; pending workers={pending}")
            }
            BusError::NoRuntime => "subscribe called outside a Tokio runtime".to_string(),
        }
    }

    /// Indicates whether the process may carry on after this error.
    ///
    /// `AlreadyClosing` signals a caller bug and is the only non-recoverable variant.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BusError::AlreadyClosing)
    }
}
