use crossbeam_channel::Receiver;
use metronome::{SpyTransport, StatsClient, SyncLock};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn new_spy_client(prefix: &str) -> (Receiver<Vec<u8>>, StatsClient) {
    let (rx, transport) = SpyTransport::new();
    (rx, StatsClient::from_transport(prefix, transport))
}

fn recv_payload(rx: &Receiver<Vec<u8>>) -> String {
    String::from_utf8(rx.try_recv().unwrap()).unwrap()
}

#[test]
fn test_every_full_rate_call_produces_one_line() {
    let (rx, client) = new_spy_client("");

    client.incr("some.counter");
    client.gauge("some.gauge", 4);
    client.timing("some.timer", 21);

    assert_eq!("some.counter:1|c", recv_payload(&rx));
    assert_eq!("some.gauge:4|g", recv_payload(&rx));
    assert_eq!("some.timer:21|ms", recv_payload(&rx));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_decr_equivalent_to_negated_count() {
    let (rx, client) = new_spy_client("app");

    client.decr("some.counter");
    client.count("some.counter", -1);

    let decr_line = recv_payload(&rx);
    let count_line = recv_payload(&rx);
    assert_eq!(decr_line, count_line);
    assert_eq!("app.some.counter:-1|c", decr_line);
}

#[test]
fn test_prefix_prepended_to_stat_names() {
    let (rx, client) = new_spy_client("app");

    client.incr("requests");

    let line = recv_payload(&rx);
    assert!(line.starts_with("app.requests:"), "got {}", line);
}

#[test]
fn test_batch_transmitted_as_one_datagram_in_call_order() {
    let (rx, transport) = SpyTransport::new();
    let client = StatsClient::builder()
        .transport(transport)
        .batch_len(4)
        .build()
        .unwrap();

    client.incr("a");
    client.count("b", 2);
    client.gauge("c", 3);
    assert!(rx.try_recv().is_err(), "batch below threshold must stay pending");

    client.timing("d", 4);
    assert_eq!("a:1|c\nb:2|c\nc:3|g\nd:4|ms", recv_payload(&rx));

    // the buffer is empty again, the next line starts a fresh batch
    client.incr("e");
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_forced_flush_drains_partial_batch() {
    let (rx, transport) = SpyTransport::new();
    let client = StatsClient::builder()
        .transport(transport)
        .batch_len(100)
        .build()
        .unwrap();

    client.incr("first");
    client.incr("second");
    client.flush();

    assert_eq!("first:1|c\nsecond:1|c", recv_payload(&rx));

    client.flush();
    assert!(rx.try_recv().is_err(), "flushing an empty batch sends nothing");
}

#[test]
fn test_unbatched_client_never_stages_lines() {
    let (rx, client) = new_spy_client("");

    for i in 0..10 {
        client.count("some.counter", i);
        assert_eq!(format!("some.counter:{}|c", i), recv_payload(&rx));
    }
}

#[test]
fn test_sampling_decisions_match_seeded_draws() {
    let (rx, transport) = SpyTransport::new();
    let client = StatsClient::builder()
        .transport(transport)
        .sample_seed(1234)
        .build()
        .unwrap();

    let mut reference = ChaCha12Rng::seed_from_u64(1234);
    let mut expected = Vec::new();
    for i in 0..100 {
        client.count_sampled("some.counter", i, 0.25);
        if reference.gen::<f64>() < 0.25 {
            expected.push(format!("some.counter:{}|c|@0.25", i));
        }
    }

    let received: Vec<String> = rx.try_iter().map(|v| String::from_utf8(v).unwrap()).collect();
    assert_eq!(expected, received);
}

#[test]
fn test_rate_one_never_suppresses_or_annotates() {
    let (rx, transport) = SpyTransport::new();
    let client = StatsClient::builder()
        .transport(transport)
        .sample_seed(99)
        .build()
        .unwrap();

    for _ in 0..50 {
        client.incr_sampled("some.counter", 1.0);
    }

    let received: Vec<String> = rx.try_iter().map(|v| String::from_utf8(v).unwrap()).collect();
    assert_eq!(50, received.len());
    for line in received {
        assert_eq!("some.counter:1|c", line);
    }
}

#[test]
fn test_timer_scoped_measurement_within_tolerance() {
    let (rx, client) = new_spy_client("");

    let mut timer = client.timer("some.timer");
    thread::sleep(Duration::from_millis(50));
    let elapsed = timer.stop();

    assert!((40..=70).contains(&elapsed), "elapsed {} ms", elapsed);
    assert_eq!(format!("some.timer:{}|ms", elapsed), recv_payload(&rx));
}

#[test]
fn test_wrapped_callable_times_every_invocation() {
    let (rx, client) = new_spy_client("");

    let mut double = {
        let mut calls = 0;
        client.wrap("some.timer", 1.0, move || {
            calls += 1;
            calls * 2
        })
    };

    assert_eq!(2, double());
    assert_eq!(4, double());

    for _ in 0..2 {
        let line = recv_payload(&rx);
        assert!(line.starts_with("some.timer:"), "got {}", line);
        assert!(line.ends_with("|ms"), "got {}", line);
    }
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_wrapped_callable_records_timing_on_panic() {
    let (rx, client) = new_spy_client("");

    let mut broken = client.wrap("some.timer", 1.0, || panic!("boom"));
    let result = panic::catch_unwind(AssertUnwindSafe(|| broken()));

    assert!(result.is_err());
    let line = recv_payload(&rx);
    assert!(line.starts_with("some.timer:"), "got {}", line);
}

#[test]
fn test_concurrent_sends_fill_exactly_one_batch() {
    const NUM_THREADS: usize = 8;

    let (rx, transport) = SpyTransport::new();
    let client = Arc::new(
        StatsClient::builder()
            .transport(transport)
            .batch_len(NUM_THREADS)
            .thread_safe()
            .build()
            .unwrap(),
    );

    let threads: Vec<_> = (0..NUM_THREADS)
        .map(|i| {
            let local = Arc::clone(&client);
            thread::spawn(move || local.count("some.counter", i as i64))
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }

    let payload = recv_payload(&rx);
    assert!(rx.try_recv().is_err(), "exactly one flush must fire");

    let mut lines: Vec<&str> = payload.split('\n').collect();
    lines.sort_unstable();
    let expected: Vec<String> = (0..NUM_THREADS).map(|i| format!("some.counter:{}|c", i)).collect();
    assert_eq!(expected, lines);
}

#[test]
fn test_thread_safe_client_shared_for_mixed_traffic() {
    let (rx, transport) = SpyTransport::new();
    let client: Arc<StatsClient<SyncLock>> = Arc::new(
        StatsClient::builder()
            .transport(transport)
            .prefix("app")
            .thread_safe()
            .build()
            .unwrap(),
    );

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let local = Arc::clone(&client);
            thread::spawn(move || {
                local.incr("some.counter");
                local.timing("some.timer", 5);
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }

    let received: Vec<String> = rx.try_iter().map(|v| String::from_utf8(v).unwrap()).collect();
    assert_eq!(8, received.len());
    for line in &received {
        assert!(line.starts_with("app."), "got {}", line);
    }
}
