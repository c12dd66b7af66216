use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};
use tokio::time::{Instant, timeout};

use subpub::{Bus, BusError, Config, DeliveryState, Handler, Subscription};

type Log = Arc<Mutex<Vec<String>>>;

struct Recorder {
    name: &'static str,
    log: Log,
}

#[async_trait]
impl Handler<String> for Recorder {
    async fn on_message(&self, msg: Arc<String>) {
        self.log.lock().push(msg.to_string());
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn record(bus: &Bus<String>, subject: &str, name: &'static str) -> (Subscription<String>, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sub = bus
        .subscribe(
            subject,
            Recorder {
                name,
                log: Arc::clone(&log),
            },
        )
        .expect("bus is open");
    (sub, log)
}

fn hellos(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("hello {i}")).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn greeting_reaches_both_subscribers_in_order() {
    let bus: Bus<String> = Bus::default();
    let (_a, a) = record(&bus, "greeting", "a");
    let (_b, b) = record(&bus, "greeting", "b");

    for msg in hellos(5) {
        bus.publish("greeting", msg).unwrap();
    }
    bus.close(Duration::from_secs(2)).await.unwrap();

    assert_eq!(*a.lock(), hellos(5));
    assert_eq!(*b.lock(), hellos(5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ordering_holds_for_long_sequences() {
    let bus: Bus<u64> = Bus::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        bus.subscribe_fn("seq", "seq", move |n: Arc<u64>| {
            let seen = Arc::clone(&seen);
            async move {
                if *n % 97 == 0 {
                    tokio::task::yield_now().await;
                }
                seen.lock().push(*n);
            }
        })
        .unwrap();
    }

    for n in 0..5_000u64 {
        bus.publish("seq", n).unwrap();
    }
    bus.close(Duration::from_secs(5)).await.unwrap();

    assert_eq!(*seen.lock(), (0..5_000u64).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_subscriber_does_not_delay_fast_one() {
    let bus: Bus<String> = Bus::default();
    let fast_done = Arc::new(Notify::new());

    bus.subscribe_fn("topic-slow", "slow", |_msg: Arc<String>| async {
        tokio::time::sleep(Duration::from_millis(200)).await;
    })
    .unwrap();
    {
        let fast_done = Arc::clone(&fast_done);
        bus.subscribe_fn("topic-slow", "fast", move |_msg: Arc<String>| {
            let fast_done = Arc::clone(&fast_done);
            async move { fast_done.notify_one() }
        })
        .unwrap();
    }

    let started = Instant::now();
    bus.publish("topic-slow", "event".to_string()).unwrap();
    timeout(Duration::from_millis(50), fast_done.notified())
        .await
        .expect("fast subscriber was blocked by slow one");
    assert!(started.elapsed() < Duration::from_millis(200));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn blocked_subscriber_does_not_block_publisher_or_peers() {
    let bus: Bus<u32> = Bus::default();
    let release = Arc::new(Notify::new());
    let (tx, mut rx) = mpsc::unbounded_channel();

    {
        let release = Arc::clone(&release);
        bus.subscribe_fn("t", "stuck", move |_msg: Arc<u32>| {
            let release = Arc::clone(&release);
            async move { release.notified().await }
        })
        .unwrap();
    }
    bus.subscribe_fn("t", "peer", move |msg: Arc<u32>| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(*msg);
        }
    })
    .unwrap();

    let started = Instant::now();
    for i in 0..1_000 {
        bus.publish("t", i).unwrap();
    }
    assert!(started.elapsed() < Duration::from_millis(500));

    for expected in 0..1_000 {
        let got = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(got, Some(expected));
    }

    let err = bus.close(Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, BusError::ShutdownTimeout { pending: 1, .. }));
    release.notify_one();
}

#[tokio::test]
async fn closed_bus_rejects_subscribe_and_publish() {
    let bus: Bus<String> = Bus::default();
    let (_sub, _) = record(&bus, "s", "r");
    bus.close(Duration::from_secs(1)).await.unwrap();

    assert!(bus.is_closing());
    assert_eq!(bus.publish("s", "x".into()), Err(BusError::Closed));
    assert_eq!(bus.publish("other", "x".into()), Err(BusError::Closed));
    assert_eq!(
        bus.subscribe_fn("s", "late", |_m: Arc<String>| async {}).unwrap_err(),
        BusError::Closed
    );
    assert_eq!(
        bus.close(Duration::from_secs(1)).await,
        Err(BusError::AlreadyClosing)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_close_has_exactly_one_winner() {
    let bus: Bus<()> = Bus::default();
    for _ in 0..8 {
        bus.subscribe_fn("x", "noop", |_m: Arc<()>| async {}).unwrap();
    }

    let mut joins = Vec::new();
    for _ in 0..8 {
        let bus = bus.clone();
        joins.push(tokio::spawn(async move {
            bus.close(Duration::from_secs(1)).await
        }));
    }

    let mut ok = 0;
    let mut already = 0;
    for j in joins {
        match j.await.unwrap() {
            Ok(()) => ok += 1,
            Err(BusError::AlreadyClosing) => already += 1,
            Err(other) => panic!("unexpected: {other}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(already, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unsubscribe_is_idempotent_under_concurrency() {
    let bus: Bus<String> = Bus::default();
    let (sub, log) = record(&bus, "u", "r");
    let (_other, other_log) = record(&bus, "u", "other");
    let sub = Arc::new(sub);

    bus.publish("u", "before".into()).unwrap();

    let mut joins = Vec::new();
    for _ in 0..16 {
        let sub = Arc::clone(&sub);
        joins.push(tokio::spawn(async move { sub.unsubscribe() }));
    }
    for j in joins {
        j.await.unwrap();
    }
    sub.unsubscribe();

    bus.publish("u", "after".into()).unwrap();
    assert_eq!(bus.subscriber_count("u"), 1);
    bus.close(Duration::from_secs(1)).await.unwrap();

    assert_eq!(*log.lock(), vec!["before"]);
    assert_eq!(*other_log.lock(), vec!["before", "after"]);
    assert_eq!(sub.state(), DeliveryState::Stopped);
}

#[tokio::test]
async fn publish_without_subscribers_has_no_effect() {
    let bus: Bus<String> = Bus::default();
    let (_sub, log) = record(&bus, "watched", "r");

    bus.publish("nobody-listens", "lost".into()).unwrap();
    bus.close(Duration::from_secs(1)).await.unwrap();

    assert!(log.lock().is_empty());
    assert_eq!(bus.stats().published, 1);
    assert_eq!(bus.stats().delivered, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queued_messages_drain_on_close() {
    let bus: Bus<String> = Bus::default();
    let gate = Arc::new(Notify::new());
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    {
        let gate = Arc::clone(&gate);
        let log = Arc::clone(&log);
        bus.subscribe_fn("d", "gated", move |msg: Arc<String>| {
            let gate = Arc::clone(&gate);
            let log = Arc::clone(&log);
            async move {
                if msg.as_str() == "hello 1" {
                    gate.notified().await;
                }
                log.lock().push(msg.to_string());
            }
        })
        .unwrap();
    }

    for msg in hellos(4) {
        bus.publish("d", msg).unwrap();
    }

    let closer = {
        let bus = bus.clone();
        tokio::spawn(async move { bus.close(Duration::from_secs(2)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(bus.is_closing());
    gate.notify_one();

    closer.await.unwrap().unwrap();
    assert_eq!(*log.lock(), hellos(4));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn zero_deadline_close_times_out_while_handler_runs() {
    let bus: Bus<String> = Bus::default();
    let entered = Arc::new(Notify::new());
    {
        let entered = Arc::clone(&entered);
        bus.subscribe_fn("busy", "busy", move |_msg: Arc<String>| {
            let entered = Arc::clone(&entered);
            async move {
                entered.notify_one();
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
        })
        .unwrap();
    }

    bus.publish("busy", "work".into()).unwrap();
    entered.notified().await;

    let res = timeout(Duration::from_millis(100), bus.close(Duration::ZERO))
        .await
        .expect("close must not block past its deadline");
    match res {
        Err(BusError::ShutdownTimeout { grace, pending }) => {
            assert_eq!(grace, Duration::ZERO);
            assert_eq!(pending, 1);
        }
        other => panic!("expected ShutdownTimeout, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_handler_keeps_receiving() {
    let bus: Bus<u32> = Bus::default();
    let ok = Arc::new(AtomicUsize::new(0));
    {
        let ok = Arc::clone(&ok);
        bus.subscribe_fn("p", "flaky", move |n: Arc<u32>| {
            let ok = Arc::clone(&ok);
            async move {
                assert!(*n % 2 == 0, "odd message {n}");
                ok.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();
    }

    for n in 0..10 {
        bus.publish("p", n).unwrap();
    }
    bus.close(Duration::from_secs(1)).await.unwrap();

    assert_eq!(ok.load(Ordering::SeqCst), 5);
    let stats = bus.stats();
    assert_eq!(stats.delivered, 5);
    assert_eq!(stats.panicked, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publishers_and_subscribers() {
    let bus: Bus<usize> = Bus::new(Config::default().with_backlog_warn(10_000));
    let total = Arc::new(AtomicUsize::new(0));

    let mut subs = Vec::new();
    for _ in 0..4 {
        let total = Arc::clone(&total);
        subs.push(
            bus.subscribe_fn("load", "count", move |_m: Arc<usize>| {
                let total = Arc::clone(&total);
                async move {
                    total.fetch_add(1, Ordering::Relaxed);
                }
            })
            .unwrap(),
        );
    }

    let mut publishers = Vec::new();
    for p in 0..4 {
        let bus = bus.clone();
        publishers.push(tokio::spawn(async move {
            for i in 0..250 {
                bus.publish("load", p * 1_000 + i).unwrap();
            }
        }));
    }
    for p in publishers {
        p.await.unwrap();
    }

    bus.close(Duration::from_secs(5)).await.unwrap();
    assert_eq!(total.load(Ordering::Relaxed), 4 * 4 * 250);
    assert!(subs.iter().all(|s| s.state() == DeliveryState::Stopped));
}

/// Rejects odd numbers while building the future, before it is ever polled.
struct OddRejecter {
    hits: Arc<AtomicUsize>,
}

impl Handler<u32> for OddRejecter {
    fn on_message<'life0, 'async_trait>(
        &'life0 self,
        msg: Arc<u32>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        Self: 'async_trait,
    {
        assert!(*msg % 2 == 0, "odd message {msg}");
        let hits = Arc::clone(&self.hits);
        Box::pin(async move {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handler_panicking_before_its_future_keeps_receiving() {
    let bus: Bus<u32> = Bus::default();
    let hits = Arc::new(AtomicUsize::new(0));
    let sub = bus
        .subscribe(
            "eager",
            OddRejecter {
                hits: Arc::clone(&hits),
            },
        )
        .unwrap();

    for n in 1..=4 {
        bus.publish("eager", n).unwrap();
    }
    bus.close(Duration::from_secs(1)).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(sub.state(), DeliveryState::Stopped);
    let stats = bus.stats();
    assert_eq!(stats.delivered, 2);
    assert_eq!(stats.panicked, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn backlog_warnings_follow_configured_step() {
    let bus: Bus<u32> = Bus::new(Config::default().with_backlog_warn(2));
    let release = Arc::new(Notify::new());
    let entered = Arc::new(Notify::new());
    let sub = {
        let release = Arc::clone(&release);
        let entered = Arc::clone(&entered);
        bus.subscribe_fn("slow", "stuck", move |_msg: Arc<u32>| {
            let release = Arc::clone(&release);
            let entered = Arc::clone(&entered);
            async move {
                entered.notify_one();
                release.notified().await;
            }
        })
        .unwrap()
    };

    // First message is taken by the worker and blocks it.
    bus.publish("slow", 0).unwrap();
    entered.notified().await;
    let before = bus.stats().backlog_warnings;

    for n in 1..=5 {
        bus.publish("slow", n).unwrap();
    }
    assert_eq!(sub.pending(), 5);
    // Depths 2 and 4 crossed the step.
    assert_eq!(bus.stats().backlog_warnings - before, 2);

    sub.unsubscribe();
    release.notify_one();
}
