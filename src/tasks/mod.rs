//! Task registry
//!
//! Builds the fixed catalog of periodic tasks, registers every entry with the
//! [`Scheduler`] at startup and cancels them all at teardown.
//!
//! Every task body is a terminal error boundary: capability failures are
//! logged where they happen and the body always returns normally, so the
//! next tick simply re-evaluates from live state.

pub mod debounce;
pub mod reload;
pub mod update;
pub mod watchdog;

pub use debounce::{DebounceCache, WatchdogId};
pub use reload::ReloadTask;
pub use update::{update_addons, AddonUpdateSummary, UpdateCheck, UpdateGuard, UpdateOutcome};
pub use watchdog::{Policy, Probe, Remedy, Watchdog, WatchdogOutcome};

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::TasksConfig;
use crate::scheduler::{task_fn, JobHandle, Scheduler, TaskFn};
use crate::services::{self, AddonCatalog, Plugin, Reloadable, Services, Supervised, Updatable};

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Update,
    Reload,
    Watchdog,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Update => write!(f, "update"),
            TaskKind::Reload => write!(f, "reload"),
            TaskKind::Watchdog => write!(f, "watchdog"),
        }
    }
}

/// Every periodic task the registry knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskName {
    UpdateSupervisor,
    UpdateAddons,
    UpdateCli,
    UpdateDns,
    UpdateAudio,
    ReloadStore,
    ReloadUpdater,
    ReloadSnapshots,
    ReloadHost,
    ReloadIngress,
    WatchdogCoreContainer,
    WatchdogCoreApi,
    WatchdogDnsContainer,
    WatchdogAudioContainer,
    WatchdogCliContainer,
}

impl TaskName {
    /// Registration order.
    pub const ALL: [TaskName; 15] = [
        TaskName::UpdateAddons,
        TaskName::UpdateSupervisor,
        TaskName::UpdateCli,
        TaskName::UpdateDns,
        TaskName::UpdateAudio,
        TaskName::ReloadStore,
        TaskName::ReloadUpdater,
        TaskName::ReloadSnapshots,
        TaskName::ReloadHost,
        TaskName::ReloadIngress,
        TaskName::WatchdogCoreContainer,
        TaskName::WatchdogCoreApi,
        TaskName::WatchdogDnsContainer,
        TaskName::WatchdogAudioContainer,
        TaskName::WatchdogCliContainer,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            TaskName::UpdateSupervisor => "update_supervisor",
            TaskName::UpdateAddons => "update_addons",
            TaskName::UpdateCli => "update_cli",
            TaskName::UpdateDns => "update_dns",
            TaskName::UpdateAudio => "update_audio",
            TaskName::ReloadStore => "reload_store",
            TaskName::ReloadUpdater => "reload_updater",
            TaskName::ReloadSnapshots => "reload_snapshots",
            TaskName::ReloadHost => "reload_host",
            TaskName::ReloadIngress => "reload_ingress",
            TaskName::WatchdogCoreContainer => "watchdog_core_container",
            TaskName::WatchdogCoreApi => "watchdog_core_api",
            TaskName::WatchdogDnsContainer => "watchdog_dns_container",
            TaskName::WatchdogAudioContainer => "watchdog_audio_container",
            TaskName::WatchdogCliContainer => "watchdog_cli_container",
        }
    }

    pub const fn kind(self) -> TaskKind {
        match self {
            TaskName::UpdateSupervisor
            | TaskName::UpdateAddons
            | TaskName::UpdateCli
            | TaskName::UpdateDns
            | TaskName::UpdateAudio => TaskKind::Update,
            TaskName::ReloadStore
            | TaskName::ReloadUpdater
            | TaskName::ReloadSnapshots
            | TaskName::ReloadHost
            | TaskName::ReloadIngress => TaskKind::Reload,
            TaskName::WatchdogCoreContainer
            | TaskName::WatchdogCoreApi
            | TaskName::WatchdogDnsContainer
            | TaskName::WatchdogAudioContainer
            | TaskName::WatchdogCliContainer => TaskKind::Watchdog,
        }
    }

    /// Key under `[intervals]` in the config file.
    pub fn config_key(self) -> String {
        format!("{}_secs", self.as_str())
    }
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog entry bound to its callback.
#[derive(Clone)]
pub struct TaskDescriptor {
    pub name: TaskName,
    pub interval: Duration,
    pub callback: TaskFn,
}

impl std::fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: TaskName,
    pub kind: TaskKind,
    pub interval_secs: u64,
}

impl From<&TaskDescriptor> for CatalogEntry {
    fn from(d: &TaskDescriptor) -> Self {
        Self {
            name: d.name,
            kind: d.name.kind(),
            interval_secs: d.interval.as_secs(),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Owns the periodic tasks of the supervisor.
pub struct Tasks {
    scheduler: Arc<dyn Scheduler>,
    services: Services,
    config: TasksConfig,
    jobs: HashSet<JobHandle>,
    cache: Arc<Mutex<DebounceCache>>,
}

impl Tasks {
    pub fn new(scheduler: Arc<dyn Scheduler>, services: Services, config: TasksConfig) -> Self {
        Self {
            scheduler,
            services,
            config,
            jobs: HashSet::new(),
            cache: Arc::new(Mutex::new(DebounceCache::new())),
        }
    }

    /// Build every task descriptor. Nothing is registered.
    pub fn catalog(&self) -> Vec<TaskDescriptor> {
        TaskName::ALL
            .into_iter()
            .map(|name| TaskDescriptor {
                name,
                interval: self.config.intervals.interval(name),
                callback: self.bind(name),
            })
            .collect()
    }

    /// Register the whole catalog with the scheduler.
    pub fn load(&mut self) {
        if !self.jobs.is_empty() {
            warn!(jobs = self.jobs.len(), "Tasks already scheduled, ignoring load");
            return;
        }

        if let Err(e) = self.config.validate() {
            error!(error = %e, "Task config is invalid, tasks without a usable interval are skipped");
        }

        for task in self.catalog() {
            if task.interval.is_zero() {
                error!(task = %task.name, "Interval is zero, task not scheduled");
                continue;
            }
            let job = self
                .scheduler
                .register_task(task.name.as_str(), task.callback, task.interval);
            self.jobs.insert(job);
        }

        info!(jobs = self.jobs.len(), "All core tasks are scheduled");
    }

    /// Cancel every registration. Failures are logged and skipped.
    pub fn unload(&mut self) {
        let total = self.jobs.len();
        let mut failed = 0usize;

        for job in self.jobs.drain() {
            if let Err(e) = self.scheduler.cancel(&job) {
                failed += 1;
                error!(%job, error = %e, "Failed to cancel periodic task");
            }
        }

        info!(total, failed, "Core tasks unscheduled");
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Shared debounce state of the watchdogs.
    pub fn debounce_cache(&self) -> Arc<Mutex<DebounceCache>> {
        Arc::clone(&self.cache)
    }

    /// Build the watchdog behind a watchdog task.
    pub fn watchdog(&self, name: TaskName) -> Option<Watchdog> {
        let id = match name {
            TaskName::WatchdogCoreContainer => WatchdogId::CoreContainer,
            TaskName::WatchdogCoreApi => WatchdogId::CoreApi,
            TaskName::WatchdogDnsContainer => WatchdogId::DnsContainer,
            TaskName::WatchdogAudioContainer => WatchdogId::AudioContainer,
            TaskName::WatchdogCliContainer => WatchdogId::CliContainer,
            _ => return None,
        };
        Some(self.make_watchdog(id))
    }

    fn make_watchdog(&self, id: WatchdogId) -> Watchdog {
        let cache = Arc::clone(&self.cache);
        let dog = match id {
            WatchdogId::CoreContainer => {
                Watchdog::container(id, Arc::clone(&self.services.core), cache)
            }
            WatchdogId::CoreApi => Watchdog::api(id, Arc::clone(&self.services.core), cache),
            WatchdogId::DnsContainer => {
                Watchdog::container(id, supervised(&self.services.dns), cache)
                    .with_reset_when_failing()
            }
            WatchdogId::AudioContainer => {
                Watchdog::container(id, supervised(&self.services.audio), cache)
            }
            WatchdogId::CliContainer => {
                Watchdog::container(id, supervised(&self.services.cli), cache)
            }
        };
        dog.with_enabled(self.config.watchdog.enabled)
    }

    fn bind_watchdog(&self, id: WatchdogId) -> TaskFn {
        let dog = Arc::new(self.make_watchdog(id));
        task_fn(move || {
            let dog = Arc::clone(&dog);
            async move {
                dog.tick().await;
            }
        })
    }

    fn bind(&self, name: TaskName) -> TaskFn {
        let s = &self.services;
        match name {
            TaskName::UpdateAddons => bind_addons(Arc::clone(&s.addons)),
            TaskName::UpdateSupervisor => bind_update(
                UpdateCheck::new(Arc::clone(&s.supervisor))
                    .with_guard(UpdateGuard::NotOnDev(self.config.updates.channel)),
            ),
            TaskName::UpdateCli => bind_update(UpdateCheck::new(updatable(&s.cli))),
            TaskName::UpdateDns => bind_update(UpdateCheck::new(updatable(&s.dns))),
            TaskName::UpdateAudio => bind_update(UpdateCheck::new(updatable(&s.audio))),
            TaskName::ReloadStore => bind_reload(&s.store),
            TaskName::ReloadUpdater => bind_reload(&s.updater),
            TaskName::ReloadSnapshots => bind_reload(&s.snapshots),
            TaskName::ReloadHost => bind_reload(&s.host),
            TaskName::ReloadIngress => bind_reload(&s.ingress),
            TaskName::WatchdogCoreContainer => self.bind_watchdog(WatchdogId::CoreContainer),
            TaskName::WatchdogCoreApi => self.bind_watchdog(WatchdogId::CoreApi),
            TaskName::WatchdogDnsContainer => self.bind_watchdog(WatchdogId::DnsContainer),
            TaskName::WatchdogAudioContainer => self.bind_watchdog(WatchdogId::AudioContainer),
            TaskName::WatchdogCliContainer => self.bind_watchdog(WatchdogId::CliContainer),
        }
    }
}

fn supervised(plugin: &Arc<dyn Plugin>) -> Arc<dyn Supervised> {
    let plugin: Arc<dyn Plugin> = Arc::clone(plugin);
    plugin
}

fn updatable(plugin: &Arc<dyn Plugin>) -> Arc<dyn Updatable> {
    let plugin: Arc<dyn Plugin> = Arc::clone(plugin);
    plugin
}

fn bind_addons(catalog: Arc<dyn AddonCatalog>) -> TaskFn {
    task_fn(move || {
        let catalog = Arc::clone(&catalog);
        async move {
            update_addons(&*catalog).await;
        }
    })
}

fn bind_update(check: UpdateCheck) -> TaskFn {
    let check = Arc::new(check);
    task_fn(move || {
        let check = Arc::clone(&check);
        async move {
            check.run().await;
        }
    })
}

fn bind_reload(component: &Arc<dyn Reloadable>) -> TaskFn {
    let task = Arc::new(ReloadTask::new(Arc::clone(component)));
    task_fn(move || {
        let task = Arc::clone(&task);
        async move {
            task.run().await;
        }
    })
}

/// Log a failed capability call and report whether it succeeded.
pub(crate) fn settle(result: services::Result<()>, context: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "{context}");
            false
        }
    }
}
