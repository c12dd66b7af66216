//! # Subscription handle.
//!
//! [`Subscription`] is the caller-held token returned by
//! [`Bus::subscribe`](crate::Bus::subscribe). It cancels exactly one
//! subscriber's interest in one subject.
//!
//! ## Rules
//! - `unsubscribe()` is guarded by a run-once primitive: only the first call has
//!   an effect, concurrent callers wait for it to finish and then return.
//! - After the first call returns, messages published afterwards never reach the
//!   handler; messages already queued are still delivered (drain, then stop).
//! - The handle holds the bus weakly: it never keeps a dropped bus alive.
//! - Dropping the handle leaves the subscription active.

use std::fmt;
use std::sync::{Arc, Once, Weak};

use crate::core::bus::Shared;
use crate::core::mailbox::{DeliveryState, Mailbox, SubscriberId};

/// Handle to one active subscription.
pub struct Subscription<M> {
    bus: Weak<Shared<M>>,
    subject: Arc<str>,
    mailbox: Arc<Mailbox<M>>,
    once: Once,
}

impl<M> Subscription<M> {
    pub(crate) fn new(bus: Weak<Shared<M>>, subject: Arc<str>, mailbox: Arc<Mailbox<M>>) -> Self {
        Self {
            bus,
            subject,
            mailbox,
            once: Once::new(),
        }
    }

    /// Removes this subscriber from the bus and lets its worker drain and stop.
    ///
    /// Idempotent and safe to call concurrently with delivery or with itself.
    pub fn unsubscribe(&self) {
        self.once.call_once(|| {
            let id = self.mailbox.id();
            if let Some(shared) = self.bus.upgrade() {
                shared.detach(&self.subject, id);
            }
            let closed = self.mailbox.close();
            tracing::debug!(
                subscriber = %id,
                subject = %self.subject,
                pending = self.mailbox.pending(),
                closed,
                "unsubscribed"
            );
        });
    }

    /// Subject this subscription listens on.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Bus-unique subscriber id.
    pub fn id(&self) -> SubscriberId {
        self.mailbox.id()
    }

    /// Current delivery state of the subscriber's worker.
    pub fn state(&self) -> DeliveryState {
        self.mailbox.state()
    }

    /// Messages queued for this subscriber and not yet handed to its handler.
    pub fn pending(&self) -> usize {
        self.mailbox.pending()
    }
}

impl<M> fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.mailbox.id())
            .field("subject", &self.subject)
            .field("state", &self.mailbox.state())
            .finish()
    }
}
