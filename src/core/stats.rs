//! Delivery counters shared between the bus and its workers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of bus counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Accepted `publish` calls (including ones with no subscribers).
    pub published: u64,
    /// Handler invocations that returned normally.
    pub delivered: u64,
    /// Handler invocations that panicked.
    pub panicked: u64,
    /// Backlog warnings emitted (see [`Config::backlog_warn`](crate::Config::backlog_warn)).
    pub backlog_warnings: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    published: AtomicU64,
    delivered: AtomicU64,
    panicked: AtomicU64,
    backlog_warnings: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn on_publish(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn on_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn on_panicked(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn on_backlog_warning(&self) {
        self.backlog_warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BusStats {
        BusStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            backlog_warnings: self.backlog_warnings.load(Ordering::Relaxed),
        }
    }
}
