//! Warden: periodic task registry of a host supervisor
//!
//! Schedules the background maintenance of a container host: update checks,
//! metadata reloads and health watchdogs that restart failed services.
//!
//! ## Architecture
//!
//! - **Services**: capability traits every managed-service proxy implements
//! - **Scheduler**: fixed-interval job registration and cancellation
//! - **Tasks**: the catalog of periodic tasks and the watchdog state machines
//! - **Config**: interval overrides, update channel and watchdog switch

pub mod config;
pub mod scheduler;
pub mod services;
#[cfg(feature = "simulation")]
pub mod simulation;
pub mod tasks;

pub use config::{Channel, ConfigError, TasksConfig};

pub use scheduler::{IntervalScheduler, JobHandle, Scheduler, SchedulerError, TaskFn};

pub use services::{
    Addon, AddonCatalog, Liveness, Plugin, Reloadable, Remediable, ServiceError, Services,
    Supervised, Updatable,
};

pub use tasks::{
    CatalogEntry, DebounceCache, TaskDescriptor, TaskKind, TaskName, Tasks, Watchdog,
    WatchdogId, WatchdogOutcome,
};
