//! Stress Tests for Memoizing Caches
//!
//! These tests hammer both designs with many threads over a small key space
//! and verify that no key is ever computed twice and that every caller sees
//! the value computed for its key.

use memo_rs::config::{MemoConfig, ServerConfig};
use memo_rs::{Memo, MemoError, MemoServer};
use scoped_threadpool::Pool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const NUM_THREADS: u32 = 16;
const OPS_PER_THREAD: usize = 2_000;
const NUM_KEYS: usize = 64;

/// One invocation counter per key.
fn counters() -> Arc<Vec<AtomicUsize>> {
    Arc::new((0..NUM_KEYS).map(|_| AtomicUsize::new(0)).collect())
}

fn assert_each_key_computed_once(counters: &[AtomicUsize]) {
    for (key, counter) in counters.iter().enumerate() {
        assert_eq!(
            counter.load(Ordering::SeqCst),
            1,
            "key {} computed wrong number of times",
            key
        );
    }
}

/// Many threads, few keys, every key requested by every thread
#[test]
fn stress_memo_high_contention() {
    let calls = counters();
    let counted = Arc::clone(&calls);
    let memo = Memo::init(
        MemoConfig::new().with_segments(8),
        move |key: &usize| -> Result<usize, ()> {
            counted[*key].fetch_add(1, Ordering::SeqCst);
            thread::yield_now();
            Ok(key * key)
        },
        None,
    );

    let mut pool = Pool::new(NUM_THREADS);
    pool.scoped(|scope| {
        for t in 0..NUM_THREADS as usize {
            let memo = &memo;
            scope.execute(move || {
                for i in 0..OPS_PER_THREAD {
                    let key = (i + t) % NUM_KEYS;
                    assert_eq!(memo.get(&key), Ok(key * key));
                }
            });
        }
    });

    assert_each_key_computed_once(&calls);
    assert_eq!(memo.len(), NUM_KEYS);
    assert_eq!(
        memo.core_metrics().requests(),
        (NUM_THREADS as usize * OPS_PER_THREAD) as u64
    );
    assert_eq!(memo.core_metrics().computations(), NUM_KEYS as u64);
}

/// Same workload through the gatekeeper
#[test]
fn stress_server_high_contention() {
    let calls = counters();
    let counted = Arc::clone(&calls);
    let server = MemoServer::init(
        ServerConfig::new("stress"),
        move |key: &usize| -> Result<usize, ()> {
            counted[*key].fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
            Ok(key + 1)
        },
    )
    .unwrap();

    let mut pool = Pool::new(NUM_THREADS);
    pool.scoped(|scope| {
        for t in 0..NUM_THREADS as usize {
            let server = &server;
            scope.execute(move || {
                for i in 0..OPS_PER_THREAD / 4 {
                    let key = (i * 7 + t) % NUM_KEYS;
                    assert_eq!(server.get(&key), Ok(key + 1));
                }
            });
        }
    });

    assert_each_key_computed_once(&calls);
    assert_eq!(server.core_metrics().computations(), NUM_KEYS as u64);
}

/// Every segment count behaves the same
#[test]
fn stress_segment_counts() {
    for segments in [1, 2, 4, 8, 16, 32] {
        let calls = counters();
        let counted = Arc::clone(&calls);
        let memo = Memo::init(
            MemoConfig::new().with_segments(segments),
            move |key: &usize| -> Result<usize, ()> {
                counted[*key].fetch_add(1, Ordering::SeqCst);
                Ok(*key)
            },
            None,
        );

        let mut pool = Pool::new(8);
        pool.scoped(|scope| {
            for _ in 0..8 {
                let memo = &memo;
                scope.execute(move || {
                    for key in (0..NUM_KEYS).rev() {
                        assert_eq!(memo.get(&key), Ok(key));
                    }
                });
            }
        });

        assert_eq!(memo.segment_count(), segments);
        assert_each_key_computed_once(&calls);
    }
}

/// Failing keys stay failed under contention
#[test]
fn stress_mixed_success_and_failure() {
    let calls = counters();
    let counted = Arc::clone(&calls);
    let memo = Memo::new(move |key: &usize| -> Result<usize, String> {
        counted[*key].fetch_add(1, Ordering::SeqCst);
        if key % 3 == 0 {
            Err(format!("key {} unavailable", key))
        } else {
            Ok(*key)
        }
    });

    let mut pool = Pool::new(NUM_THREADS);
    pool.scoped(|scope| {
        for _ in 0..NUM_THREADS {
            let memo = &memo;
            scope.execute(move || {
                for i in 0..OPS_PER_THREAD / 2 {
                    let key = i % NUM_KEYS;
                    let outcome = memo.get(&key);
                    if key % 3 == 0 {
                        assert_eq!(
                            outcome,
                            Err(MemoError::Computation(format!("key {} unavailable", key)))
                        );
                    } else {
                        assert_eq!(outcome, Ok(key));
                    }
                }
            });
        }
    });

    assert_each_key_computed_once(&calls);
    let expected_failures = (0..NUM_KEYS).filter(|k| k % 3 == 0).count() as u64;
    assert_eq!(memo.core_metrics().failed_computations(), expected_failures);
}

/// Concurrent gets while the server closes: no deadlock, no double compute
#[test]
fn stress_server_close_under_load() {
    let calls = counters();
    let counted = Arc::clone(&calls);
    let server = Arc::new(
        MemoServer::new(move |key: &usize| -> Result<usize, ()> {
            counted[*key].fetch_add(1, Ordering::SeqCst);
            Ok(*key)
        })
        .unwrap(),
    );
    let closed_seen = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..NUM_THREADS as usize)
        .map(|t| {
            let server = Arc::clone(&server);
            let closed_seen = Arc::clone(&closed_seen);
            thread::spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    match server.get(&((i + t) % NUM_KEYS)) {
                        Ok(value) => assert_eq!(value, (i + t) % NUM_KEYS),
                        Err(MemoError::Closed) => {
                            closed_seen.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(other) => panic!("unexpected error: {:?}", other),
                    }
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(5));
    server.close();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    for counter in calls.iter() {
        assert!(counter.load(Ordering::SeqCst) <= 1);
    }
    assert!(server.is_closed());
    assert_eq!(server.get(&0), Err(MemoError::Closed));
}
