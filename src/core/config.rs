//! # Bus configuration.
//!
//! Provides [`Config`] centralized settings for a [`Bus`](crate::Bus).
//!
//! Config is used in two ways:
//! 1. **Bus creation**: `Bus::new(config)` / `Bus::default()`
//! 2. **Config-driven shutdown**: `Bus::shutdown()` and `Bus::shutdown_on_signal()`
//!    wait at most [`Config::grace`] for workers to drain.
//!
//! ## Sentinel values
//! - `grace = 0s` → close does not wait (returns `ShutdownTimeout` unless every worker already stopped)
//! - `backlog_warn = 0` → backlog warnings disabled

use std::time::Duration;

/// Runtime configuration for a bus.
///
/// ## Field semantics
/// - `grace`: Maximum wait for subscriber workers to drain on config-driven shutdown
/// - `backlog_warn`: Queue depth step that triggers a backlog warning (`0` = disabled)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for subscriber workers on [`Bus::shutdown`](crate::Bus::shutdown).
    ///
    /// Workers still running when it elapses are left to finish in the background.
    pub grace: Duration,

    /// Pending-queue depth step for backlog warnings.
    ///
    /// Queues are unbounded; a subscriber whose pending count reaches a
    /// multiple of this value logs a `warn!` so a stuck consumer is visible.
    pub backlog_warn: usize,
}

impl Config {
    /// Returns the backlog warning step as an `Option`.
    ///
    /// - `None` → warnings disabled
    /// - `Some(n)` → warn every `n` pending messages
    #[inline]
    pub fn backlog_warn_step(&self) -> Option<usize> {
        match self.backlog_warn {
            0 => None,
            n => Some(n),
        }
    }

    /// Sets the shutdown grace period.
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Sets the backlog warning step.
    #[must_use]
    pub fn with_backlog_warn(mut self, step: usize) -> Self {
        self.backlog_warn = step;
        self
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 5s`
    /// - `backlog_warn = 0` (disabled)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            backlog_warn: 0,
        }
    }
}
