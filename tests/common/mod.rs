//! Recording fakes shared by the integration tests.
//!
//! Every fake logs the capability calls it receives so tests can assert on
//! exact call order and counts.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use warden::scheduler::{JobHandle, Scheduler, SchedulerError, TaskFn};
use warden::services::{
    Addon, AddonCatalog, Liveness, Reloadable, Remediable, Result, ServiceError, Services,
    Updatable,
};

// ============================================================================
// Supervised / updatable service
// ============================================================================

pub struct FakeService {
    name: &'static str,
    calls: Mutex<Vec<&'static str>>,
    pub running: AtomicBool,
    pub api_up: AtomicBool,
    pub in_progress: AtomicBool,
    pub error_state: AtomicBool,
    pub watchdog_enabled: AtomicBool,
    pub failing: AtomicBool,
    pub start_fails: AtomicBool,
    pub restart_fails: AtomicBool,
    pub reset_fails: AtomicBool,
    pub update_fails: AtomicBool,
    current: Mutex<Option<String>>,
    latest: Mutex<Option<String>>,
}

impl FakeService {
    /// A healthy, up-to-date service.
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: Mutex::new(Vec::new()),
            running: AtomicBool::new(true),
            api_up: AtomicBool::new(true),
            in_progress: AtomicBool::new(false),
            error_state: AtomicBool::new(false),
            watchdog_enabled: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            start_fails: AtomicBool::new(false),
            restart_fails: AtomicBool::new(false),
            reset_fails: AtomicBool::new(false),
            update_fails: AtomicBool::new(false),
            current: Mutex::new(Some("1.0.0".to_string())),
            latest: Mutex::new(Some("1.0.0".to_string())),
        })
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    pub fn set_versions(&self, current: Option<&str>, latest: Option<&str>) {
        *self.current.lock().unwrap() = current.map(String::from);
        *self.latest.lock().unwrap() = latest.map(String::from);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn outcome(&self, fails: &AtomicBool, err: ServiceError) -> Result<()> {
        if fails.load(Ordering::SeqCst) {
            Err(err)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Liveness for FakeService {
    fn name(&self) -> &str {
        self.name
    }

    fn watchdog_enabled(&self) -> bool {
        self.watchdog_enabled.load(Ordering::SeqCst)
    }

    fn error_state(&self) -> bool {
        self.error_state.load(Ordering::SeqCst)
    }

    fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    async fn is_running(&self) -> bool {
        self.record("is_running");
        self.running.load(Ordering::SeqCst)
    }

    async fn is_failing(&self) -> bool {
        self.record("is_failing");
        self.failing.load(Ordering::SeqCst)
    }

    async fn check_api_state(&self) -> bool {
        self.record("check_api_state");
        self.api_up.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Remediable for FakeService {
    async fn start(&self) -> Result<()> {
        self.record("start");
        let result = self.outcome(
            &self.start_fails,
            ServiceError::Start {
                service: self.name.to_string(),
                reason: "container refused".to_string(),
            },
        );
        if result.is_ok() {
            self.running.store(true, Ordering::SeqCst);
        }
        result
    }

    async fn restart(&self) -> Result<()> {
        self.record("restart");
        self.outcome(
            &self.restart_fails,
            ServiceError::Restart {
                service: self.name.to_string(),
                reason: "timeout".to_string(),
            },
        )
    }

    async fn reset(&self) -> Result<()> {
        self.record("reset");
        self.outcome(
            &self.reset_fails,
            ServiceError::Reset {
                service: self.name.to_string(),
                reason: "read-only filesystem".to_string(),
            },
        )
    }
}

#[async_trait]
impl Updatable for FakeService {
    fn name(&self) -> &str {
        self.name
    }

    fn current_version(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    fn latest_version(&self) -> Option<String> {
        self.latest.lock().unwrap().clone()
    }

    async fn update(&self) -> Result<()> {
        self.record("update");
        self.outcome(
            &self.update_fails,
            ServiceError::Update {
                service: self.name.to_string(),
                version: self.latest_version().unwrap_or_default(),
                reason: "download failed".to_string(),
            },
        )
    }
}

// ============================================================================
// Reloadable component
// ============================================================================

pub struct FakeReloadable {
    name: &'static str,
    pub reloads: AtomicUsize,
    pub fails: AtomicBool,
}

impl FakeReloadable {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reloads: AtomicUsize::new(0),
            fails: AtomicBool::new(false),
        })
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reloadable for FakeReloadable {
    fn name(&self) -> &str {
        self.name
    }

    async fn reload(&self) -> Result<()> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        if self.fails.load(Ordering::SeqCst) {
            Err(ServiceError::Reload {
                service: self.name.to_string(),
                reason: "index corrupt".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Add-ons
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateBehavior {
    Succeed,
    Fail,
    Panic,
}

pub struct FakeAddon {
    pub slug: &'static str,
    pub installed: bool,
    pub auto_update: bool,
    pub schema_ok: bool,
    pub current: Option<&'static str>,
    pub latest: Option<&'static str>,
    pub behavior: UpdateBehavior,
    /// Simulated download time of an update
    pub delay: Duration,
    pub updates: AtomicUsize,
    pub finished: AtomicBool,
}

impl FakeAddon {
    /// Installed, auto-updating and one version behind.
    pub fn outdated(slug: &'static str) -> Self {
        Self {
            slug,
            installed: true,
            auto_update: true,
            schema_ok: true,
            current: Some("1.0.0"),
            latest: Some("1.1.0"),
            behavior: UpdateBehavior::Succeed,
            delay: Duration::ZERO,
            updates: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
        }
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Addon for FakeAddon {
    fn slug(&self) -> &str {
        self.slug
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    fn auto_update(&self) -> bool {
        self.auto_update
    }

    fn current_version(&self) -> Option<String> {
        self.current.map(String::from)
    }

    fn latest_version(&self) -> Option<String> {
        self.latest.map(String::from)
    }

    fn test_update_schema(&self) -> bool {
        self.schema_ok
    }

    async fn update(&self) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.finished.store(true, Ordering::SeqCst);
        match self.behavior {
            UpdateBehavior::Succeed => Ok(()),
            UpdateBehavior::Fail => Err(ServiceError::Update {
                service: self.slug.to_string(),
                version: self.latest.unwrap_or_default().to_string(),
                reason: "image pull failed".to_string(),
            }),
            UpdateBehavior::Panic => panic!("add-on {} blew up", self.slug),
        }
    }
}

pub struct FakeCatalog {
    pub addons: Vec<Arc<FakeAddon>>,
}

impl AddonCatalog for FakeCatalog {
    fn all(&self) -> Vec<Arc<dyn Addon>> {
        self.addons
            .iter()
            .map(|a| Arc::clone(a) as Arc<dyn Addon>)
            .collect()
    }
}

// ============================================================================
// Fleet
// ============================================================================

/// Concrete handles to every fake behind a [`Services`] set.
pub struct Fleet {
    pub core: Arc<FakeService>,
    pub supervisor: Arc<FakeService>,
    pub cli: Arc<FakeService>,
    pub dns: Arc<FakeService>,
    pub audio: Arc<FakeService>,
    pub catalog: Arc<FakeCatalog>,
    pub store: Arc<FakeReloadable>,
    pub updater: Arc<FakeReloadable>,
    pub snapshots: Arc<FakeReloadable>,
    pub host: Arc<FakeReloadable>,
    pub ingress: Arc<FakeReloadable>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::with_addons(Vec::new())
    }

    pub fn with_addons(addons: Vec<Arc<FakeAddon>>) -> Self {
        Self {
            core: FakeService::new("core"),
            supervisor: FakeService::new("supervisor"),
            cli: FakeService::new("cli"),
            dns: FakeService::new("dns"),
            audio: FakeService::new("audio"),
            catalog: Arc::new(FakeCatalog { addons }),
            store: FakeReloadable::new("store"),
            updater: FakeReloadable::new("updater"),
            snapshots: FakeReloadable::new("snapshots"),
            host: FakeReloadable::new("host"),
            ingress: FakeReloadable::new("ingress"),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            core: Arc::clone(&self.core) as _,
            supervisor: Arc::clone(&self.supervisor) as _,
            cli: Arc::clone(&self.cli) as _,
            dns: Arc::clone(&self.dns) as _,
            audio: Arc::clone(&self.audio) as _,
            addons: Arc::clone(&self.catalog) as _,
            store: Arc::clone(&self.store) as _,
            updater: Arc::clone(&self.updater) as _,
            snapshots: Arc::clone(&self.snapshots) as _,
            host: Arc::clone(&self.host) as _,
            ingress: Arc::clone(&self.ingress) as _,
        }
    }
}

// ============================================================================
// Recording scheduler
// ============================================================================

pub struct Registration {
    pub job: JobHandle,
    pub name: String,
    pub interval: Duration,
    pub callback: TaskFn,
}

/// Scheduler that never runs anything on its own. Tests drive callbacks by
/// hand with [`RecordingScheduler::fire`].
#[derive(Default)]
pub struct RecordingScheduler {
    next_id: AtomicU64,
    registrations: Mutex<Vec<Registration>>,
    live: Mutex<HashSet<JobHandle>>,
    cancelled: Mutex<Vec<JobHandle>>,
    /// Task names whose cancellation is rejected
    pub reject_cancel: Mutex<HashSet<String>>,
}

impl RecordingScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn registered(&self) -> Vec<(String, Duration)> {
        self.registrations
            .lock()
            .unwrap()
            .iter()
            .map(|r| (r.name.clone(), r.interval))
            .collect()
    }

    pub fn registered_intervals(&self) -> HashMap<String, Duration> {
        self.registered().into_iter().collect()
    }

    pub fn cancelled(&self) -> Vec<JobHandle> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn live_jobs(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    /// Run the most recent registration of `name` once.
    pub async fn fire(&self, name: &str) {
        let callback = {
            let regs = self.registrations.lock().unwrap();
            let reg = regs
                .iter()
                .rev()
                .find(|r| r.name == name)
                .unwrap_or_else(|| panic!("task {name} was never registered"));
            Arc::clone(&reg.callback)
        };
        callback().await;
    }
}

impl Scheduler for RecordingScheduler {
    fn register_task(&self, name: &str, callback: TaskFn, interval: Duration) -> JobHandle {
        let job = JobHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.live.lock().unwrap().insert(job);
        self.registrations.lock().unwrap().push(Registration {
            job,
            name: name.to_string(),
            interval,
            callback,
        });
        job
    }

    fn cancel(&self, job: &JobHandle) -> std::result::Result<(), SchedulerError> {
        self.cancelled.lock().unwrap().push(*job);

        let name = self
            .registrations
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.job == *job)
            .map(|r| r.name.clone());
        if let Some(name) = name {
            if self.reject_cancel.lock().unwrap().contains(&name) {
                return Err(SchedulerError::UnknownJob(*job));
            }
        }

        if self.live.lock().unwrap().remove(job) {
            Ok(())
        } else {
            Err(SchedulerError::UnknownJob(*job))
        }
    }
}
