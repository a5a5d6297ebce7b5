use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

/// Fixed-interval runner with a run-lock: at most one pass is in flight, and a
/// tick that fires while a pass is still running is skipped.
pub struct Scheduler {
    interval: Duration,
    run_lock: Arc<Mutex<()>>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            // tokio::time::interval panics on a zero period.
            interval: interval.max(Duration::from_millis(1)),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs `pass` immediately, then on every tick, forever.
    pub async fn run<F, Fut>(&self, pass: F)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let Ok(guard) = self.run_lock.clone().try_lock_owned() else {
                tracing::warn!(
                    "[Scheduler] Previous pass still running after {:?}, skipping this tick",
                    self.interval
                );
                continue;
            };

            let fut = pass();
            tokio::spawn(async move {
                fut.await;
                drop(guard);
            });
        }
    }
}
