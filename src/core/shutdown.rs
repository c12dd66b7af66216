//! # Shutdown coordinator.
//!
//! Drives an orderly bus-wide stop and provides [`wait_for_shutdown_signal`],
//! an async helper that completes when the process receives a termination signal.
//!
//! ## Shutdown path
//! ```text
//! close(grace) / close_until(deadline)
//!   ├─► write lock
//!   │     ├─ closing already set ─► Err(AlreadyClosing)
//!   │     ├─ closing = true       (subscribe/publish now fail with Closed)
//!   │     └─ take registry, close every mailbox (RUNNING → DRAINING)
//!   ├─► unlock
//!   └─► workers.close(); timeout_at(deadline, workers.wait()):
//!          ├─ Ok (all STOPPED)  → Ok(())
//!          └─ deadline elapsed  → Err(ShutdownTimeout { grace, pending })
//!                                  (workers keep draining in the background)
//! ```
//!
//! ## Signals
//! **Unix platforms:** `SIGINT`, `SIGTERM`, `SIGQUIT`.
//! **Windows platforms:** `Ctrl-C` via [`tokio::signal::ctrl_c`].

use std::time::Duration;

use tokio::time::Instant;

use crate::core::bus::Bus;
use crate::error::BusError;

impl<M> Bus<M>
where
    M: Send + Sync + 'static,
{
    /// Closes the bus and waits up to `grace` for every subscriber to drain.
    ///
    /// # Errors
    /// - [`BusError::AlreadyClosing`] if close was already invoked.
    /// - [`BusError::ShutdownTimeout`] if `grace` elapsed first; the remaining
    ///   workers are not cancelled.
    pub async fn close(&self, grace: Duration) -> Result<(), BusError> {
        let now = Instant::now();
        // Saturate instead of overflowing on huge durations.
        let deadline = now
            .checked_add(grace)
            .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30));
        self.close_until(deadline).await
    }

    /// Closes the bus and waits until `deadline` for every subscriber to drain.
    ///
    /// Same semantics as [`close`](Self::close) with an absolute deadline.
    pub async fn close_until(&self, deadline: Instant) -> Result<(), BusError> {
        let started = Instant::now();
        let closed = self.begin_close()?;
        tracing::info!(subscribers = closed, "bus closing; draining subscribers");

        let workers = &self.shared.workers;
        workers.close();

        match tokio::time::timeout_at(deadline, workers.wait()).await {
            Ok(()) => {
                tracing::info!(elapsed = ?started.elapsed(), "bus closed; all subscribers drained");
                Ok(())
            }
            Err(_elapsed) => {
                let grace = deadline.saturating_duration_since(started);
                let pending = workers.len();
                tracing::warn!(
                    ?grace,
                    pending,
                    "shutdown deadline exceeded; workers left draining"
                );
                Err(BusError::ShutdownTimeout { grace, pending })
            }
        }
    }

    /// Closes the bus using the configured [`Config::grace`](crate::Config::grace).
    pub async fn shutdown(&self) -> Result<(), BusError> {
        self.close(self.shared.cfg.grace).await
    }

    /// Waits for a termination signal, then performs [`shutdown`](Self::shutdown).
    ///
    /// If signal listeners cannot be installed the failure is logged and the bus
    /// closes right away.
    pub async fn shutdown_on_signal(&self) -> Result<(), BusError> {
        match wait_for_shutdown_signal().await {
            Ok(()) => tracing::info!("termination signal received"),
            Err(e) => tracing::error!(error = %e, "signal listener unavailable; closing now"),
        }
        self.shutdown().await
    }

    /// Marks the bus closing and closes every registered mailbox.
    ///
    /// All state changes happen under the exclusive registry lock; no waiting
    /// happens here. Returns the number of subscribers that were closed.
    fn begin_close(&self) -> Result<usize, BusError> {
        let mut reg = self.shared.registry.write();
        if reg.closing {
            return Err(BusError::AlreadyClosing);
        }
        reg.closing = true;

        let subjects = std::mem::take(&mut reg.subjects);
        let mut closed = 0;
        for mailbox in subjects.values().flat_map(|set| set.values()) {
            if mailbox.close() {
                closed += 1;
            }
        }
        Ok(closed)
    }
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when Ctrl-C is received, or `Err` if registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
