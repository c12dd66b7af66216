//! # Greeting Example
//!
//! Two subscribers on the same subject, five messages, graceful close.
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example greeting
//! ```

use std::sync::Arc;
use std::time::Duration;

use subpub::{Bus, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let bus: Bus<String> = Bus::new(Config::default().with_grace(Duration::from_secs(2)));

    for name in ["subscriber-1", "subscriber-2"] {
        bus.subscribe_fn("greeting", name, move |msg: Arc<String>| async move {
            println!("{name} got: {msg}");
        })?;
    }

    for i in 1..=5 {
        bus.publish("greeting", format!("hello {i}"))?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    println!("Shutting down...");
    bus.shutdown().await?;
    Ok(())
}
