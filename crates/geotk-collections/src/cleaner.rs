//! Background purging of dead weak entries.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// A collection that can drop entries whose values are gone.
pub trait Purge {
    /// Remove dead entries, returning how many were removed.
    fn purge(&self) -> usize;
}

/// Purge `target` every `period` on a tokio task.
///
/// The task holds only a weak reference and ends on its own once the target
/// is dropped. Abort the returned handle to stop it earlier.
pub fn spawn_cleaner<T>(target: &Arc<T>, period: Duration) -> JoinHandle<()>
where
    T: Purge + Send + Sync + 'static,
{
    let target: Weak<T> = Arc::downgrade(target);
    info!(period_ms = period.as_millis() as u64, "Starting weak entry cleaner");

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(live) = target.upgrade() else {
                debug!("Cleaner target dropped, stopping");
                break;
            };
            let removed = live.purge();
            if removed > 0 {
                debug!(removed, "Purged dead entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        runs: AtomicUsize,
    }

    impl Purge for Counter {
        fn purge(&self) -> usize {
            self.runs.fetch_add(1, Ordering::SeqCst);
            0
        }
    }

    #[tokio::test]
    async fn test_cleaner_runs_periodically() {
        let counter = Arc::new(Counter::default());
        let handle = spawn_cleaner(&counter, Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(counter.runs.load(Ordering::SeqCst) >= 2);
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleaner_stops_when_target_dropped() {
        let counter = Arc::new(Counter::default());
        let handle = spawn_cleaner(&counter, Duration::from_millis(10));
        drop(counter);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("cleaner should stop")
            .unwrap();
    }
}
