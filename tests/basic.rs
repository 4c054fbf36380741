use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokenbucket::{
    config::BucketConfig, options::BucketOptions, utils::init, Bucket, Error, TokenBucket,
    TokenBucketAsync,
};

const TICK: Duration = Duration::from_millis(1);

#[test]
fn test_no_tokens() {
    let tb = TokenBucket::new();
    assert!(!tb.get());
    assert!(!tb.peek());

    tb.set_max(0);
    tb.set_count(0);
    assert!(!tb.get());
    assert!(!tb.peek());
}

#[test]
fn test_some_tokens() {
    let tb = TokenBucket::new();
    tb.set_max(1);
    tb.set_count(1);
    assert!(tb.peek());
    assert!(tb.get());
    assert!(!tb.get());
    assert!(!tb.peek());
}

#[test]
fn test_peek_iff_nonempty() {
    let tb = TokenBucket::new();
    for capacity in 0..4 {
        for count in 0..=capacity {
            tb.set_max(capacity);
            tb.set_count(count);
            assert_eq!(tb.peek(), count > 0, "capacity {capacity}, count {count}");
        }
    }
}

#[test]
fn test_adding_tokens() {
    init();
    let tb = TokenBucket::new();
    tb.set_max(5);
    assert_eq!(tb.count(), 0);

    tb.start(TICK).unwrap();
    assert!(matches!(tb.start(TICK), Err(Error::AlreadyRunning)));
    thread::sleep(Duration::from_millis(100));
    tb.stop().unwrap();
    assert!(matches!(tb.stop(), Err(Error::AlreadyStopped)));

    assert_eq!(tb.count(), 5);
    assert!(tb.peek());
    for i in 0..5 {
        assert!(tb.get(), "expected get #{i} to succeed");
    }
    assert!(!tb.get());
    assert!(!tb.peek());

    // stopped: nothing comes back
    thread::sleep(Duration::from_millis(20));
    assert!(!tb.peek());

    tb.start(TICK).unwrap();
    thread::sleep(Duration::from_millis(50));
    assert!(tb.peek());
    tb.stop().unwrap();
}

#[test]
fn test_concurrent_get_never_overdraws() {
    let tb = Arc::new(TokenBucket::new());
    tb.set_max(100);
    tb.set_count(100);

    let mut handles = vec![];
    for _ in 0..8 {
        let tb = Arc::clone(&tb);
        handles.push(thread::spawn(move || {
            let mut acquired = 0u64;
            for _ in 0..50 {
                if tb.get() {
                    acquired += 1;
                }
            }
            acquired
        }));
    }

    let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 100);
    assert_eq!(tb.count(), 0);
}

#[test]
fn test_consumers_race_refill() {
    let tb = Arc::new(TokenBucket::new());
    tb.set_max(3);
    tb.start(TICK).unwrap();

    let mut handles = vec![];
    for _ in 0..4 {
        let tb = Arc::clone(&tb);
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                tb.get();
                assert!(tb.count() <= 3);
                thread::sleep(Duration::from_micros(100));
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    tb.stop().unwrap();
    assert!(tb.count() <= 3);
}

#[test]
fn test_concurrent_lifecycle_serialized() {
    let tb = Arc::new(TokenBucket::new());
    tb.set_max(1);

    let mut handles = vec![];
    for _ in 0..4 {
        let tb = Arc::clone(&tb);
        handles.push(thread::spawn(move || {
            let mut started = 0;
            let mut stopped = 0;
            for _ in 0..25 {
                match tb.start(TICK) {
                    Ok(()) => started += 1,
                    Err(e) => assert!(e.is_state_mismatch()),
                }
                match tb.stop() {
                    Ok(()) => stopped += 1,
                    Err(e) => assert!(e.is_state_mismatch()),
                }
            }
            (started, stopped)
        }));
    }

    let (started, stopped) = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .fold((0, 0), |(a, b), (c, d)| (a + c, b + d));

    // every stop pairs with a start, and the last one left it stopped
    assert_eq!(started, stopped);
    assert!(!tb.is_running());
    assert!(matches!(tb.stop(), Err(Error::AlreadyStopped)));
}

#[test]
fn test_options_from_config() {
    let config = BucketConfig {
        capacity: 2,
        count: Some(2),
        interval_ms: 1000,
        autostart: None,
    };
    let tb = BucketOptions::from_config(config).spawn_sync().unwrap();
    assert!(!tb.is_running());
    assert!(tb.get());
    assert!(tb.get());
    assert!(!tb.get());
}

#[tokio::test]
async fn test_async_adding_tokens() {
    init();
    let tb = TokenBucketAsync::new();
    tb.set_max(5);
    tb.start(TICK).await.unwrap();
    assert!(matches!(tb.start(TICK).await, Err(Error::AlreadyRunning)));
    tokio::time::sleep(Duration::from_millis(100)).await;
    tb.stop().await.unwrap();
    assert!(matches!(tb.stop().await, Err(Error::AlreadyStopped)));

    assert_eq!(tb.count(), 5);
    for _ in 0..5 {
        assert!(tb.get());
    }
    assert!(!tb.peek());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_shared_between_tasks() {
    let tb = Arc::new(TokenBucketAsync::new());
    tb.set_max(10);
    tb.set_count(10);

    let mut handles = vec![];
    for _ in 0..4 {
        let tb = Arc::clone(&tb);
        handles.push(tokio::spawn(async move {
            let mut acquired = 0u64;
            for _ in 0..10 {
                if tb.get() {
                    acquired += 1;
                }
                tokio::task::yield_now().await;
            }
            acquired
        }));
    }

    let mut total = 0;
    for h in handles {
        total += h.await.unwrap();
    }
    assert_eq!(total, 10);
}
