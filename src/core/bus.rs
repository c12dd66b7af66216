//! # Bus: subject registry, fan-out publishing and subscription management.
//!
//! The [`Bus`] owns the subject → subscribers registry, the closing flag and the
//! tracker of outstanding subscriber workers.
//!
//! ## Architecture
//! ```text
//! subscribe(subject, handler)
//!   └─► write lock ─► closing? ─► Err(Closed)
//!                  └─► Mailbox::new ─► workers.spawn(worker.run()) ─► insert ─► Subscription
//!
//! publish(subject, msg)
//!   └─► read lock ─► closing? ─► Err(Closed)
//!                 └─► snapshot subject's mailboxes ─► unlock
//!                        └─► Arc::new(msg) ─► mailbox.enqueue(Arc-clone) for each (never waits)
//!
//! Subscription::unsubscribe()
//!   └─► write lock ─► remove mailbox (drop empty subject) ─► unlock ─► mailbox.close()
//!
//! close(grace)   (see `shutdown`)
//!   └─► write lock ─► closing = true ─► close every mailbox ─► unlock
//!        └─► workers.wait() bounded by deadline
//! ```
//!
//! ## Rules
//! - Registry mutation is serialized by a single exclusive lock; publish snapshots
//!   take the shared lock and release it before touching any mailbox.
//! - A handler may call `publish`/`subscribe` on the same bus without deadlocking.
//! - Per-subject fan-out order follows subscription order (ids are monotonic).
//! - Subscribing requires a Tokio runtime: the worker is spawned immediately.
//!   The runtime is looked up before the registry lock is taken.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio_util::task::TaskTracker;

use crate::core::config::Config;
use crate::core::mailbox::{Mailbox, SubscriberId};
use crate::core::stats::{BusStats, Counters};
use crate::core::subscription::Subscription;
use crate::error::BusError;
use crate::handlers::{Handler, HandlerFn, HandlerRef};

type SubjectSet<M> = BTreeMap<SubscriberId, Arc<Mailbox<M>>>;

/// Subject → subscribers mapping plus the closing flag, guarded together.
pub(crate) struct Registry<M> {
    pub(crate) closing: bool,
    pub(crate) subjects: HashMap<Arc<str>, SubjectSet<M>>,
}

/// State shared by every clone of a [`Bus`] and (weakly) by its subscriptions.
pub(crate) struct Shared<M> {
    pub(crate) cfg: Config,
    pub(crate) registry: RwLock<Registry<M>>,
    pub(crate) workers: TaskTracker,
    pub(crate) counters: Arc<Counters>,
    next_id: AtomicU64,
}

impl<M> Shared<M> {
    /// Removes one subscriber from its subject set; drops the set once empty.
    pub(crate) fn detach(&self, subject: &str, id: SubscriberId) -> Option<Arc<Mailbox<M>>> {
        let mut reg = self.registry.write();
        let set = reg.subjects.get_mut(subject)?;
        let removed = set.remove(&id);
        if set.is_empty() {
            reg.subjects.remove(subject);
        }
        removed
    }
}

/// In-process publish/subscribe bus.
///
/// Cheap to clone: every clone refers to the same registry and workers.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use subpub::Bus;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), subpub::BusError> {
/// let bus: Bus<String> = Bus::default();
///
/// let sub = bus.subscribe_fn("greeting", "printer", |msg: Arc<String>| async move {
///     println!("got {msg}");
/// })?;
///
/// bus.publish("greeting", "hello".to_string())?;
/// sub.unsubscribe();
/// bus.close(Duration::from_secs(1)).await?;
/// # Ok(())
/// # }
/// ```
pub struct Bus<M> {
    pub(crate) shared: Arc<Shared<M>>,
}

impl<M> Clone for Bus<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M> fmt::Debug for Bus<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reg = self.shared.registry.read();
        f.debug_struct("Bus")
            .field("closing", &reg.closing)
            .field("subjects", &reg.subjects.len())
            .field("workers", &self.shared.workers.len())
            .finish()
    }
}

impl<M> Default for Bus<M>
where
    M: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<M> Bus<M>
where
    M: Send + Sync + 'static,
{
    /// Creates an empty, open bus.
    #[must_use]
    pub fn new(cfg: Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                cfg,
                registry: RwLock::new(Registry {
                    closing: false,
                    subjects: HashMap::new(),
                }),
                workers: TaskTracker::new(),
                counters: Arc::new(Counters::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Returns the configuration this bus was built with.
    pub fn config(&self) -> &Config {
        &self.shared.cfg
    }

    /// Subscribes `handler` to `subject`.
    ///
    /// Starts a dedicated worker for the new subscriber and returns the handle
    /// that cancels it. Dropping the handle does **not** unsubscribe.
    ///
    /// # Errors
    /// - [`BusError::Closed`] if the bus is closing.
    /// - [`BusError::NoRuntime`] when called outside of a Tokio runtime.
    pub fn subscribe<H>(&self, subject: &str, handler: H) -> Result<Subscription<M>, BusError>
    where
        H: Handler<M>,
    {
        self.subscribe_ref(subject, Arc::new(handler))
    }

    /// Subscribes an async closure to `subject`.
    ///
    /// Shorthand for `subscribe(subject, HandlerFn::new(name, f))`.
    pub fn subscribe_fn<F, Fut>(
        &self,
        subject: &str,
        name: &'static str,
        f: F,
    ) -> Result<Subscription<M>, BusError>
    where
        F: Fn(Arc<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe(subject, HandlerFn::new(name, f))
    }

    /// Subscribes an already shared handler to `subject`.
    ///
    /// The same handler may back several subscriptions; each still gets its own
    /// queue and worker.
    pub fn subscribe_ref(
        &self,
        subject: &str,
        handler: HandlerRef<M>,
    ) -> Result<Subscription<M>, BusError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BusError::NoRuntime)?;
        let subject: Arc<str> = Arc::from(subject);
        let handler_name = handler.name().to_string();

        let mailbox = {
            let mut reg = self.shared.registry.write();
            if reg.closing {
                return Err(BusError::Closed);
            }

            let id = SubscriberId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
            let (mailbox, worker) = Mailbox::new(
                id,
                Arc::clone(&subject),
                handler,
                Arc::clone(&self.shared.counters),
                self.shared.cfg.backlog_warn_step(),
            );
            let mailbox = Arc::new(mailbox);

            // Spawned under the lock so a concurrent close always tracks this worker.
            self.shared.workers.spawn_on(worker.run(), &runtime);
            reg.subjects
                .entry(Arc::clone(&subject))
                .or_default()
                .insert(id, Arc::clone(&mailbox));
            mailbox
        };

        tracing::debug!(
            subscriber = %mailbox.id(),
            subject = %subject,
            handler = %handler_name,
            "subscribed"
        );
        Ok(Subscription::new(
            Arc::downgrade(&self.shared),
            subject,
            mailbox,
        ))
    }

    /// Publishes `msg` to every current subscriber of `subject`.
    ///
    /// The message is enqueued for each subscriber without waiting for any
    /// handler. Publishing to a subject with no subscribers succeeds and does
    /// nothing.
    ///
    /// # Errors
    /// [`BusError::Closed`] if the bus is closing.
    pub fn publish(&self, subject: &str, msg: M) -> Result<(), BusError> {
        self.publish_arc(subject, Arc::new(msg))
    }

    /// Publishes a pre-allocated `Arc<M>` (no extra allocation).
    pub fn publish_arc(&self, subject: &str, msg: Arc<M>) -> Result<(), BusError> {
        let targets: Vec<Arc<Mailbox<M>>> = {
            let reg = self.shared.registry.read();
            if reg.closing {
                return Err(BusError::Closed);
            }
            reg.subjects
                .get(subject)
                .map(|set| set.values().cloned().collect())
                .unwrap_or_default()
        };
        self.shared.counters.on_publish();

        if targets.is_empty() {
            tracing::trace!(subject, "publish without subscribers");
            return Ok(());
        }
        for mailbox in &targets {
            mailbox.enqueue(Arc::clone(&msg));
        }
        tracing::trace!(subject, fanout = targets.len(), "published");
        Ok(())
    }

    /// True once `close` has started.
    pub fn is_closing(&self) -> bool {
        self.shared.registry.read().closing
    }

    /// Number of active subscribers on `subject`.
    pub fn subscriber_count(&self, subject: &str) -> usize {
        self.shared
            .registry
            .read()
            .subjects
            .get(subject)
            .map_or(0, BTreeMap::len)
    }

    /// Returns the sorted list of subjects that have at least one subscriber.
    pub fn subjects(&self) -> Vec<String> {
        let reg = self.shared.registry.read();
        let mut names: Vec<String> = reg.subjects.keys().map(|s| s.to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Number of subscriber workers that have not stopped yet.
    pub fn pending_workers(&self) -> usize {
        self.shared.workers.len()
    }

    /// Snapshot of delivery counters.
    pub fn stats(&self) -> BusStats {
        self.shared.counters.snapshot()
    }
}
