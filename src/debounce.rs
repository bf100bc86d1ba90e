use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Lets a request through only once no newer request on the same key has
/// arrived for a quiet period. Keys are independent of each other.
#[derive(Debug)]
pub struct Debouncer {
    quiet_period: Duration,
    tickets: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl Debouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            tickets: AtomicU64::new(0),
            latest: Mutex::new(HashMap::new()),
        }
    }

    /// Waits out the quiet period. Returns `Some(value)` if this was the
    /// last call on `key` in that window, `None` if a later call on the
    /// same key superseded it.
    pub async fn settle<T>(&self, key: &str, value: T) -> Option<T> {
        if self.quiet_period.is_zero() {
            return Some(value);
        }

        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        self.with_latest(|latest| {
            latest.insert(key.to_string(), ticket);
        });

        tokio::time::sleep(self.quiet_period).await;

        let settled = self.with_latest(|latest| match latest.get(key) {
            Some(current) if *current == ticket => {
                latest.remove(key);
                true
            }
            _ => false,
        });

        settled.then(|| value)
    }

    fn with_latest<R>(&self, f: impl FnOnce(&mut HashMap<String, u64>) -> R) -> R {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut latest)
    }
}

#[test]
fn zero_quiet_period_passes_everything() {
    let debouncer = Debouncer::new(Duration::ZERO);

    tokio_test::block_on(async {
        assert_eq!(debouncer.settle("source", "gun").await, Some("gun"));
        assert_eq!(debouncer.settle("source", "gunt").await, Some("gunt"));
    });
}

#[test]
fn burst_lets_only_last_through() {
    let debouncer = Debouncer::new(Duration::from_millis(30));

    let (first, second, third) = tokio_test::block_on(async {
        futures::join!(
            debouncer.settle("source", "gun"),
            debouncer.settle("source", "gunt"),
            debouncer.settle("source", "guntur"),
        )
    });

    assert_eq!(first, None);
    assert_eq!(second, None);
    assert_eq!(third, Some("guntur"));
}

#[test]
fn keys_do_not_supersede_each_other() {
    let debouncer = Debouncer::new(Duration::from_millis(30));

    let (source, destination) = tokio_test::block_on(async {
        futures::join!(debouncer.settle("source", "Guntur"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            debouncer.settle("destination", "Nambur").await
        })
    });

    assert_eq!(source, Some("Guntur"));
    assert_eq!(destination, Some("Nambur"));
}

#[test]
fn spaced_calls_each_pass() {
    let debouncer = Debouncer::new(Duration::from_millis(10));

    tokio_test::block_on(async {
        assert_eq!(debouncer.settle("source", 1).await, Some(1));
        assert_eq!(debouncer.settle("source", 2).await, Some(2));
    });

    assert!(debouncer.with_latest(|latest| latest.is_empty()));
}
