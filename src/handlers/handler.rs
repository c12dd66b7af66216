//! # Subscriber callback trait.
//!
//! [`Handler`] is the extension point a subscriber plugs into the bus. Each
//! subscription is driven by a dedicated worker fed by an unbounded queue owned
//! by the bus.
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching, sleeps) – they do **not** block
//!   the publisher nor other subscribers.
//! - Messages are delivered one at a time, in publish order, to a single handler
//!   invocation; the next message waits until the previous call returned.
//! - A panic inside [`Handler::on_message`] is caught by the worker, logged and
//!   counted; the worker moves on to the next queued message.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use subpub::Handler;
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Handler<String> for Audit {
//!     async fn on_message(&self, msg: Arc<String>) {
//!         // write audit record...
//!         let _ = msg;
//!     }
//!
//!     fn name(&self) -> &str { "audit" }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

/// Shared handle to a message handler.
pub type HandlerRef<M> = Arc<dyn Handler<M>>;

/// Callback invoked by a subscription's worker for every delivered message.
///
/// The payload is shared with every other subscriber of the same subject and
/// must be treated as immutable.
#[async_trait]
pub trait Handler<M>: Send + Sync + 'static {
    /// Processes a single message.
    async fn on_message(&self, msg: Arc<M>);

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
