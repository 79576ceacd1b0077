//! Interval scheduler interface
//!
//! The task registry only needs two things from a scheduler: register a
//! callback on a fixed period and get back a handle, then cancel that handle
//! at teardown. [`IntervalScheduler`] is the tokio-backed implementation used
//! by the host binary; tests substitute their own.

pub mod interval;

pub use interval::IntervalScheduler;

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

/// Future produced by one invocation of a periodic task.
pub type TaskFuture = BoxFuture<'static, ()>;

/// Periodic task body. Called once per tick; each call yields a fresh future.
pub type TaskFn = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Opaque token identifying a live registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobHandle(u64);

impl JobHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("unknown or already cancelled job: {0}")]
    UnknownJob(JobHandle),
}

/// Capability the task registry consumes.
///
/// Implementations must never run two invocations of the same callback
/// concurrently, and cancellation must only prevent future invocations.
pub trait Scheduler: Send + Sync {
    fn register_task(&self, name: &str, callback: TaskFn, interval: Duration) -> JobHandle;

    fn cancel(&self, job: &JobHandle) -> Result<(), SchedulerError>;
}

/// Wrap an async closure into a [`TaskFn`].
pub fn task_fn<F, Fut>(f: F) -> TaskFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    Arc::new(move || -> TaskFuture { Box::pin(f()) })
}
