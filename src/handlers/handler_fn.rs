//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(Arc<M>) -> Fut`, producing a fresh
//! future per delivered message.
//!
//! ## Concurrency semantics
//! - Every delivery builds a **new** future; nothing is shared between calls
//!   unless the closure captures it explicitly (use `Arc<...>` for that).
//! - The closure is `Fn`, not `FnMut`: the worker only ever holds `&self`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use subpub::{Handler, HandlerFn};
//!
//! let h = HandlerFn::new("printer", |msg: Arc<String>| async move {
//!     println!("got {msg}");
//! });
//!
//! assert_eq!(Handler::<String>::name(&h), "printer");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::handlers::handler::Handler;

/// Function-backed handler implementation.
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it behind an `Arc`.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<M, F, Fut> Handler<M> for HandlerFn<F>
where
    M: Send + Sync + 'static,
    F: Fn(Arc<M>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_message(&self, msg: Arc<M>) {
        (self.f)(msg).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
