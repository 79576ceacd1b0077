//! Tokio interval scheduler
//!
//! Every registration gets its own loop: wait for the next tick, run the
//! body to completion, repeat. Because the body is awaited inline, a slow
//! invocation delays the next tick instead of overlapping with it.
//!
//! Cancellation is cooperative. Cancelling a job trips its token, which the
//! loop only observes while waiting for a tick, so an in-flight body always
//! finishes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use super::{JobHandle, Scheduler, SchedulerError, TaskFn};

/// Shortest period a job may run at. `tokio::time::interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Tokio-backed [`Scheduler`].
///
/// `register_task` spawns onto the current runtime and must be called from
/// within one.
pub struct IntervalScheduler {
    next_id: AtomicU64,
    jobs: Mutex<HashMap<JobHandle, CancellationToken>>,
    root: CancellationToken,
    tracker: TaskTracker,
}

impl IntervalScheduler {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            jobs: Mutex::new(HashMap::new()),
            root: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Number of registrations that have not been cancelled.
    pub fn active_jobs(&self) -> usize {
        self.lock_jobs().len()
    }

    /// Cancel every job and wait for all loops to exit, including any body
    /// that is still running.
    pub async fn shutdown(&self) {
        let remaining = {
            let mut jobs = self.lock_jobs();
            let n = jobs.len();
            jobs.clear();
            n
        };
        info!(remaining, "Scheduler shutting down");
        self.root.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        debug!("Scheduler shutdown complete");
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, HashMap<JobHandle, CancellationToken>> {
        // Poisoning only means a panic while holding the guard; the map itself is still valid.
        self.jobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for IntervalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for IntervalScheduler {
    fn register_task(&self, name: &str, callback: TaskFn, interval: Duration) -> JobHandle {
        let interval = if interval.is_zero() {
            warn!(task = %name, "Zero interval requested, using {}s", MIN_PERIOD.as_secs());
            MIN_PERIOD
        } else {
            interval
        };
        let job = JobHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = self.root.child_token();
        self.lock_jobs().insert(job, token.clone());

        let name = name.to_string();
        debug!(task = %name, %job, interval_secs = interval.as_secs(), "Registering periodic task");

        self.tracker.spawn(async move {
            // First invocation one full period after registration.
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!(task = %name, %job, "Periodic task stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        trace!(task = %name, "Running periodic task");
                        callback().await;
                    }
                }
            }
        });

        job
    }

    fn cancel(&self, job: &JobHandle) -> Result<(), SchedulerError> {
        match self.lock_jobs().remove(job) {
            Some(token) => {
                token.cancel();
                Ok(())
            }
            None => Err(SchedulerError::UnknownJob(*job)),
        }
    }
}
