//! # Signal Shutdown Example
//!
//! Publishes a tick every second until SIGINT/SIGTERM (Ctrl-C), then closes
//! the bus within the configured grace period.
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example signal_shutdown
//! ```

use std::sync::Arc;
use std::time::Duration;

use subpub::{Bus, BusError, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let bus: Bus<String> = Bus::new(Config::default().with_grace(Duration::from_secs(3)));

    let ticks = bus.subscribe_fn("ticks", "printer", |msg: Arc<String>| async move {
        println!("tick: {msg}");
    })?;

    let publisher = {
        let bus = bus.clone();
        tokio::spawn(async move {
            let mut n = 0u64;
            loop {
                n += 1;
                match bus.publish("ticks", format!("#{n}")) {
                    Ok(()) => {}
                    Err(BusError::Closed) => break,
                    Err(e) => return Err(e),
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Ok(())
        })
    };

    bus.shutdown_on_signal().await?;
    publisher.await??;
    println!("subscription {} ended in state {:?}", ticks.id(), ticks.state());
    Ok(())
}
