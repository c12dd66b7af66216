//! # Message handlers.
//!
//! This module provides the subscriber-side callback abstraction:
//! - [`Handler`] - trait invoked once per delivered message
//! - [`HandlerFn`] - closure-backed handler implementation
//! - [`HandlerRef`] - shared reference to a handler (`Arc<dyn Handler<M>>`)

mod handler;
mod handler_fn;

pub use handler::{Handler, HandlerRef};
pub use handler_fn::HandlerFn;
