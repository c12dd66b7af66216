//! Bus core: registry, delivery queues and shutdown.
//!
//! The public API from this module is [`Bus`], its [`Subscription`] handles and
//! [`Config`]; everything else stays internal.
//!
//! Internal modules:
//! - [`bus`]: subject registry, subscribe and publish;
//! - [`mailbox`]: per-subscriber unbounded queue and its worker loop;
//! - [`subscription`]: idempotent unsubscribe handle;
//! - [`shutdown`]: bus-wide close with deadline and OS signal handling;
//! - [`config`]: bus settings;
//! - [`stats`]: delivery counters.

mod bus;
mod config;
mod mailbox;
mod shutdown;
mod stats;
mod subscription;

pub use bus::Bus;
pub use config::Config;
pub use mailbox::{DeliveryState, SubscriberId};
pub use shutdown::wait_for_shutdown_signal;
pub use stats::BusStats;
pub use subscription::Subscription;
