//! # Slow Subscriber Example
//!
//! A slow handler (200ms per message) and a fast one share a subject.
//! The fast one keeps up with the publisher; the slow one drains its backlog
//! during shutdown.
//!
//! ## Run
//! ```bash
//! cargo run --example slow_subscriber
//! ```

use std::sync::Arc;
use std::time::Duration;

use subpub::{Bus, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = Config::default()
        .with_grace(Duration::from_secs(2))
        .with_backlog_warn(3);
    let bus: Bus<String> = Bus::new(cfg);

    bus.subscribe_fn("topic-slow", "slow", |msg: Arc<String>| async move {
        println!("[slow] received: {msg}, processing...");
        tokio::time::sleep(Duration::from_millis(200)).await;
        println!("[slow] done processing {msg}");
    })?;

    bus.subscribe_fn("topic-slow", "fast", |msg: Arc<String>| async move {
        println!("[fast] received: {msg}");
    })?;

    for i in 1..=5 {
        let msg = format!("message {i}");
        println!("publishing: {msg}");
        bus.publish("topic-slow", msg)?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    match bus.shutdown().await {
        Ok(()) => println!("all subscribers drained"),
        Err(e) => println!("shutdown incomplete: {e}"),
    }
    println!("stats: {:?}", bus.stats());
    Ok(())
}
