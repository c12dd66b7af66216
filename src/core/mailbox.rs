//! # Per-subscriber delivery queue and worker.
//!
//! Every subscription owns one [`Mailbox`]: an unbounded FIFO queue plus a
//! dedicated worker task that drains it and invokes the subscriber's handler,
//! one message at a time.
//!
//! ## Architecture
//! ```text
//! publish(subject, msg)
//!     │                       (Arc-clone per subscriber)
//!     ├──► mailbox 1 ──► [queue] ──► worker 1 ──► handler1.on_message()
//!     │                                  └──────► panic → logged, next message
//!     ├──► mailbox 2 ──► [queue] ──► worker 2 ──► handler2.on_message()
//!     └──► mailbox N ──► [queue] ──► worker N ──► handlerN.on_message()
//! ```
//!
//! ## Lifecycle
//! ```text
//! RUNNING ──close()──► DRAINING ──queue empty──► STOPPED
//! ```
//! - **Running**: the worker parks on the empty queue and wakes on enqueue or close.
//! - **Draining**: closed; new enqueues are dropped, queued messages still delivered.
//! - **Stopped**: closed and empty; the worker has exited. Terminal.
//!
//! ## Rules
//! - **Per-subscriber FIFO**: messages reach the handler in enqueue order.
//! - **Isolation**: handlers run with no lock held; a slow handler only delays its own queue.
//! - **Private lock**: the sender slot is guarded by a lock scoped to this mailbox only.
//! - **Panic containment**: a panicking handler is caught with `catch_unwind`,
//!   the worker keeps processing subsequent messages.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a handler uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::core::stats::Counters;
use crate::handlers::HandlerRef;

/// Identifier of a single subscription, unique within its bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub(crate) u64);

impl SubscriberId {
    /// Returns the raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Delivery state of a subscription's worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryState {
    /// Accepting messages; the worker waits for or processes them.
    Running,
    /// Closed; already queued messages are still being delivered.
    Draining,
    /// Closed and fully drained; the worker has exited.
    Stopped,
}

/// Queue bookkeeping shared with the worker.
///
/// Kept apart from [`Mailbox`] so the worker never holds the sender and the
/// queue closes as soon as the mailbox drops its sender.
#[derive(Debug, Default)]
struct Backlog {
    pending: AtomicUsize,
    stopped: AtomicBool,
}

/// Sending half of a subscriber: the delivery queue and its closed state.
pub(crate) struct Mailbox<M> {
    id: SubscriberId,
    subject: Arc<str>,
    tx: Mutex<Option<mpsc::UnboundedSender<Arc<M>>>>,
    backlog: Arc<Backlog>,
    backlog_warn: Option<usize>,
    counters: Arc<Counters>,
}

/// Receiving half of a subscriber, consumed by [`Worker::run`].
pub(crate) struct Worker<M> {
    id: SubscriberId,
    subject: Arc<str>,
    rx: mpsc::UnboundedReceiver<Arc<M>>,
    handler: HandlerRef<M>,
    backlog: Arc<Backlog>,
    counters: Arc<Counters>,
}

impl<M> Mailbox<M> {
    /// Creates the mailbox and the worker bound to it.
    ///
    /// The worker must be spawned by the caller; exactly one task ever owns it.
    pub(crate) fn new(
        id: SubscriberId,
        subject: Arc<str>,
        handler: HandlerRef<M>,
        counters: Arc<Counters>,
        backlog_warn: Option<usize>,
    ) -> (Self, Worker<M>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let backlog = Arc::new(Backlog::default());

        let mailbox = Self {
            id,
            subject: Arc::clone(&subject),
            tx: Mutex::new(Some(tx)),
            backlog: Arc::clone(&backlog),
            backlog_warn,
            counters: Arc::clone(&counters),
        };
        let worker = Worker {
            id,
            subject,
            rx,
            handler,
            backlog,
            counters,
        };
        (mailbox, worker)
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    /// Appends a message to the tail of the queue and wakes the worker.
    ///
    /// Returns `false` (and drops the message) if the mailbox is already closed.
    pub(crate) fn enqueue(&self, msg: Arc<M>) -> bool {
        let depth = {
            let slot = self.tx.lock();
            let Some(tx) = slot.as_ref() else {
                return false;
            };
            // Counted before sending so the worker never observes an underflow.
            let depth = self.backlog.pending.fetch_add(1, Ordering::AcqRel) + 1;
            if tx.send(msg).is_err() {
                self.backlog.pending.fetch_sub(1, Ordering::AcqRel);
                return false;
            }
            depth
        };

        if backlog_warning_due(depth, self.backlog_warn) {
            self.counters.on_backlog_warning();
            tracing::warn!(
                subscriber = %self.id,
                subject = %self.subject,
                pending = depth,
                "subscriber backlog growing"
            );
        }
        true
    }

    /// Marks the mailbox closed and wakes the worker so it starts draining.
    ///
    /// Returns `true` only for the call that actually closed it.
    pub(crate) fn close(&self) -> bool {
        // Dropping the only sender lets `recv` return `None` once the queue is empty.
        self.tx.lock().take().is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }

    /// Messages enqueued but not yet picked up by the worker.
    pub(crate) fn pending(&self) -> usize {
        self.backlog.pending.load(Ordering::Acquire)
    }

    pub(crate) fn state(&self) -> DeliveryState {
        if self.backlog.stopped.load(Ordering::Acquire) {
            DeliveryState::Stopped
        } else if self.is_closed() {
            DeliveryState::Draining
        } else {
            DeliveryState::Running
        }
    }
}

impl<M> Worker<M>
where
    M: Send + Sync + 'static,
{
    /// Drains the queue until the mailbox is closed and empty.
    pub(crate) async fn run(mut self) {
        tracing::debug!(
            subscriber = %self.id,
            subject = %self.subject,
            handler = self.handler.name(),
            "worker started"
        );

        while let Some(msg) = self.rx.recv().await {
            self.backlog.pending.fetch_sub(1, Ordering::AcqRel);

            // Builds the handler future inside the guard: `on_message` itself may panic.
            let handler = &self.handler;
            let delivery = async move { handler.on_message(msg).await };
            match std::panic::AssertUnwindSafe(delivery).catch_unwind().await {
                Ok(()) => self.counters.on_delivered(),
                Err(panic_err) => {
                    self.counters.on_panicked();
                    tracing::error!(
                        subscriber = %self.id,
                        subject = %self.subject,
                        handler = self.handler.name(),
                        panic = %panic_message(&*panic_err),
                        "handler panicked; continuing with next message"
                    );
                }
            }
        }

        self.backlog.stopped.store(true, Ordering::Release);
        tracing::debug!(subscriber = %self.id, subject = %self.subject, "worker stopped");
    }
}

/// True when a queue that just grew to `depth` sits on a multiple of `step`.
fn backlog_warning_due(depth: usize, step: Option<usize>) -> bool {
    match step {
        Some(step) => depth > 0 && depth % step == 0,
        None => false,
    }
}

fn panic_message(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
