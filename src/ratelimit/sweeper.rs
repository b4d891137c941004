//! Periodic cleanup of stale rate limit entries.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::limiter::BackoffRateLimiter;

/// Handle to a running cleanup task.
pub struct CleanupTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl CleanupTask {
    /// Start sweeping `limiter` every `interval`.
    ///
    /// The first sweep happens one full interval after the task starts.
    pub fn spawn<C: Clock + 'static>(
        limiter: Arc<BackoffRateLimiter<C>>,
        interval: Duration,
    ) -> Self {
        let (stop, mut stopped) = oneshot::channel();
        let period = interval.max(Duration::from_millis(1));

        info!(interval_ms = period.as_millis() as u64, "Starting rate limit cleanup task");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        let removed = limiter.cleanup_rate_limit();
                        if removed > 0 {
                            debug!(removed = removed, "Swept stale rate limit entries");
                        }
                    }
                }
            }

            debug!("Rate limit cleanup task stopped");
        });

        Self { stop, handle }
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Rate limit cleanup task ended abnormally");
        }
    }
}
