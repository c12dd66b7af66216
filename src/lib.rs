//! # subpub
//!
//! **subpub** is an in-process publish/subscribe bus for Tokio applications.
//!
//! Producers publish messages tagged with a subject string; consumers register
//! per-subject handlers and receive messages asynchronously, in order, without
//! blocking each other or the publisher.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   publish("orders", msg)          subscribe("orders", handler)
//!            │                                 │
//!            ▼                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Bus (registry)                                                   │
//! │  - subject → { SubscriberId → Mailbox }   (RwLock)                │
//! │  - closing flag                                                   │
//! │  - TaskTracker of subscriber workers                              │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        │ snapshot, unlock, enqueue (never waits)
//!        ▼                  ▼                  ▼
//!   ┌──────────┐       ┌──────────┐       ┌──────────┐
//!   │ Mailbox  │       │ Mailbox  │       │ Mailbox  │   unbounded FIFO,
//!   │ [queue]  │       │ [queue]  │       │ [queue]  │   private lock
//!   └────┬─────┘       └────┬─────┘       └────┬─────┘
//!        ▼                  ▼                  ▼
//!     worker 1           worker 2           worker N       one task each
//!        ▼                  ▼                  ▼
//!   on_message()       on_message()       on_message()    panics contained
//! ```
//!
//! ### Lifecycle
//! ```text
//! subscribe ──► RUNNING ──unsubscribe / close──► DRAINING ──queue empty──► STOPPED
//!
//! close(grace):
//!   ├─► closing = true          (subscribe/publish → BusError::Closed)
//!   ├─► every mailbox closed    (drain, then stop; nothing discarded)
//!   └─► wait for workers, bounded by grace
//!         ├─ all stopped  ─► Ok(())
//!         └─ deadline hit ─► BusError::ShutdownTimeout (workers keep draining)
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                 |
//! |-------------------|----------------------------------------------------------|------------------------------------|
//! | **Bus**           | Subject registry, fan-out publish, graceful close.       | [`Bus`]                            |
//! | **Handlers**      | Per-message callbacks, as trait objects or closures.     | [`Handler`], [`HandlerFn`]         |
//! | **Subscriptions** | Idempotent cancellation and delivery state.              | [`Subscription`], [`DeliveryState`]|
//! | **Errors**        | Typed errors for closed bus, double close, timeouts.     | [`BusError`]                       |
//! | **Configuration** | Shutdown grace and backlog warnings.                     | [`Config`]                         |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use subpub::{Bus, Config};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus: Bus<String> = Bus::new(Config::default());
//!
//!     let sub = bus.subscribe_fn("greeting", "printer", |msg: Arc<String>| async move {
//!         println!("received: {msg}");
//!     })?;
//!
//!     for i in 1..=3 {
//!         bus.publish("greeting", format!("hello {i}"))?;
//!     }
//!
//!     sub.unsubscribe();
//!     bus.close(Duration::from_secs(1)).await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod handlers;

// ---- Public re-exports ----

pub use crate::core::{
    Bus, BusStats, Config, DeliveryState, SubscriberId, Subscription, wait_for_shutdown_signal,
};
pub use error::BusError;
pub use handlers::{Handler, HandlerFn, HandlerRef};
