//! Simulated service fleet
//!
//! In-memory proxies implementing every capability trait, with random
//! crashes, API stalls and failed actions driven by a single failure rate.
//! Used by the `warden` binary to exercise the task registry end to end
//! without real containers behind it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::services::{
    Addon, AddonCatalog, Liveness, Reloadable, Remediable, Result, ServiceError, Services,
    Updatable,
};

/// How long a simulated start/restart/update keeps the service busy.
const ACTION_DURATION: Duration = Duration::from_millis(200);

/// Shared randomness of the simulated fleet.
#[derive(Clone)]
pub struct Dice {
    rng: Arc<Mutex<StdRng>>,
    failure_rate: f64,
}

impl Dice {
    pub fn new(failure_rate: f64, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            rng: Arc::new(Mutex::new(rng)),
            failure_rate: if failure_rate.is_finite() {
                failure_rate.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    /// True with probability `failure_rate`.
    fn fails(&self) -> bool {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_bool(self.failure_rate)
    }
}

// ============================================================================
// Simulated Service
// ============================================================================

/// A container-backed service with an API, a version and a reload hook.
pub struct SimService {
    name: String,
    dice: Dice,
    running: AtomicBool,
    failing: AtomicBool,
    busy: AtomicBool,
    version: Mutex<String>,
    latest: String,
}

impl SimService {
    pub fn new(name: &str, version: &str, latest: &str, dice: Dice) -> Self {
        Self {
            name: name.to_string(),
            dice,
            running: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            version: Mutex::new(version.to_string()),
            latest: latest.to_string(),
        }
    }

    async fn act(&self, what: &str) -> bool {
        self.busy.store(true, Ordering::SeqCst);
        tokio::time::sleep(ACTION_DURATION).await;
        self.busy.store(false, Ordering::SeqCst);
        let ok = !self.dice.fails();
        debug!(service = %self.name, action = what, ok, "Simulated action finished");
        ok
    }

    fn fail(&self, kind: fn(String, String) -> ServiceError) -> ServiceError {
        kind(self.name.clone(), "simulated failure".to_string())
    }
}

#[async_trait]
impl Liveness for SimService {
    fn name(&self) -> &str {
        &self.name
    }

    fn in_progress(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    async fn is_running(&self) -> bool {
        if self.running.load(Ordering::SeqCst) && self.dice.fails() {
            info!(service = %self.name, "Simulated container crash");
            self.running.store(false, Ordering::SeqCst);
            self.failing.store(self.dice.fails(), Ordering::SeqCst);
        }
        self.running.load(Ordering::SeqCst)
    }

    async fn is_failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }

    async fn check_api_state(&self) -> bool {
        self.is_running().await && !self.dice.fails()
    }
}

#[async_trait]
impl Remediable for SimService {
    async fn start(&self) -> Result<()> {
        if self.act("start").await {
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(self.fail(|service, reason| ServiceError::Start { service, reason }))
        }
    }

    async fn restart(&self) -> Result<()> {
        if self.act("restart").await {
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(self.fail(|service, reason| ServiceError::Restart { service, reason }))
        }
    }

    async fn reset(&self) -> Result<()> {
        self.failing.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Updatable for SimService {
    fn name(&self) -> &str {
        &self.name
    }

    fn current_version(&self) -> Option<String> {
        Some(self.version.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn latest_version(&self) -> Option<String> {
        Some(self.latest.clone())
    }

    async fn update(&self) -> Result<()> {
        if self.act("update").await {
            *self.version.lock().unwrap_or_else(PoisonError::into_inner) = self.latest.clone();
            Ok(())
        } else {
            Err(ServiceError::Update {
                service: self.name.clone(),
                version: self.latest.clone(),
                reason: "simulated failure".to_string(),
            })
        }
    }
}

/// A component that only reloads metadata.
pub struct SimComponent {
    name: String,
    dice: Dice,
}

impl SimComponent {
    pub fn new(name: &str, dice: Dice) -> Self {
        Self {
            name: name.to_string(),
            dice,
        }
    }
}

#[async_trait]
impl Reloadable for SimComponent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reload(&self) -> Result<()> {
        if self.dice.fails() {
            Err(ServiceError::Reload {
                service: self.name.clone(),
                reason: "simulated failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Simulated Add-ons
// ============================================================================

pub struct SimAddon {
    slug: String,
    auto_update: bool,
    schema_ok: bool,
    inner: SimService,
}

impl SimAddon {
    pub fn new(slug: &str, auto_update: bool, schema_ok: bool, dice: Dice) -> Self {
        Self {
            slug: slug.to_string(),
            auto_update,
            schema_ok,
            inner: SimService::new(slug, "1.0.0", "1.1.0", dice),
        }
    }
}

#[async_trait]
impl Addon for SimAddon {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn is_installed(&self) -> bool {
        true
    }

    fn auto_update(&self) -> bool {
        self.auto_update
    }

    fn current_version(&self) -> Option<String> {
        Updatable::current_version(&self.inner)
    }

    fn latest_version(&self) -> Option<String> {
        Updatable::latest_version(&self.inner)
    }

    fn test_update_schema(&self) -> bool {
        self.schema_ok
    }

    async fn update(&self) -> Result<()> {
        Updatable::update(&self.inner).await
    }
}

pub struct SimAddonCatalog {
    addons: Vec<Arc<dyn Addon>>,
}

impl AddonCatalog for SimAddonCatalog {
    fn all(&self) -> Vec<Arc<dyn Addon>> {
        self.addons.clone()
    }
}

// ============================================================================
// Fleet
// ============================================================================

/// Build a full simulated [`Services`] set.
pub fn fleet(failure_rate: f64, seed: Option<u64>) -> Services {
    let dice = Dice::new(failure_rate, seed);
    let service = |name: &str, version: &str, latest: &str| {
        Arc::new(SimService::new(name, version, latest, dice.clone()))
    };
    let component = |name: &str| -> Arc<dyn Reloadable> {
        Arc::new(SimComponent::new(name, dice.clone()))
    };

    let addons: Vec<Arc<dyn Addon>> = vec![
        Arc::new(SimAddon::new("mosquitto", true, true, dice.clone())),
        Arc::new(SimAddon::new("samba", true, false, dice.clone())),
        Arc::new(SimAddon::new("ssh", false, true, dice.clone())),
    ];

    Services {
        core: service("core", "2024.1.0", "2024.1.0"),
        supervisor: service("supervisor", "2024.01.1", "2024.01.2"),
        cli: service("cli", "1.5.0", "1.5.0"),
        dns: service("dns", "2.1.0", "2.2.0"),
        audio: service("audio", "1.3.0", "1.3.0"),
        addons: Arc::new(SimAddonCatalog { addons }),
        store: component("store"),
        updater: component("updater"),
        snapshots: component("snapshots"),
        host: component("host"),
        ingress: component("ingress"),
    }
}
