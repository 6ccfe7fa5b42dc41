//! Periodic background refresh.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::cache::{CacheRecord, Dashboard};

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Handle to a periodic refresh task.
///
/// Cancelling (or dropping) the handle stops future ticks. A refresh that is
/// already running completes, but its record is not delivered.
#[derive(Debug)]
pub struct Subscription {
    state: Arc<CancelState>,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn spawn<F>(dashboard: Weak<Dashboard>, period: Duration, callback: F) -> Self
    where
        F: Fn(Arc<CacheRecord>) + Send + Sync + 'static,
    {
        let state = Arc::new(CancelState::default());
        let task_state = Arc::clone(&state);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = task_state.notify.notified() => break,
                    _ = ticker.tick() => {}
                }

                if task_state.cancelled.load(Ordering::SeqCst) {
                    break;
                }
                let Some(dashboard) = dashboard.upgrade() else {
                    debug!("dashboard dropped, stopping refresh subscription");
                    break;
                };

                let record = dashboard.refresh().await;
                drop(dashboard);

                if task_state.cancelled.load(Ordering::SeqCst) {
                    debug!("subscription cancelled during refresh, dropping record");
                    break;
                }
                callback(record);
            }
        });

        Self { state, handle }
    }

    /// Stop future refreshes.
    pub fn cancel(&self) {
        if !self.state.cancelled.swap(true, Ordering::SeqCst) {
            self.state.notify.notify_one();
        }
    }

    /// Whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
