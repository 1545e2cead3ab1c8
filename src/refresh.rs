//! Background auto-refresh timers
//!
//! A `RefreshTask` runs a tick function on a fixed interval until it is
//! dropped, stopped, or the tick function asks it to stop. Dropping the
//! handle aborts the task, so a timer can never outlive its owner.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Configuration for auto-refresh of subscribed endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Interval between refreshes
    pub interval: Duration,
    /// Whether auto-refresh is enabled
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            enabled: true,
        }
    }
}

/// Handle for one running refresh timer
#[derive(Debug)]
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl RefreshTask {
    /// Spawns a timer calling `tick` every `interval`
    ///
    /// The first call happens one full interval after spawning. The timer
    /// stops when `tick` resolves to `false`. Must be called from within a
    /// Tokio runtime.
    pub fn spawn<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            // Skip the first tick (immediate)
            interval.tick().await;

            loop {
                interval.tick().await;
                if !tick().await {
                    break;
                }
            }
        });

        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the timer
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
