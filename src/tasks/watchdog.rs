//! Watchdog state machine
//!
//! One [`Watchdog`] per supervised liveness check. Nothing is carried between
//! ticks except the debounce counter, so every tick re-derives its decision
//! from live proxy state in a fixed order:
//!
//! 1. watchdog disabled or service in error state: skip
//! 2. an operation is already in progress on the service: skip
//! 3. probe liveness (container or API)
//! 4. healthy: clear the debounce counter, done
//! 5. unhealthy, immediate policy: `reset` first if the watchdog resets
//!    failing services and the service is failing, then `start`
//! 6. unhealthy, debounced policy: warn on the first miss, `restart` on the
//!    second and clear the counter whatever the outcome
//!
//! Remediation errors are logged here and never leave [`Watchdog::tick`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, trace, warn};

use super::debounce::{DebounceCache, WatchdogId, STRIKES_BEFORE_ACTION};
use super::settle;
use crate::services::Supervised;

/// Which liveness signal a watchdog reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Container-running probe
    Container,
    /// Application API probe
    Api,
}

/// How a watchdog reacts to a failed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// `start` on the first failed probe
    Immediate,
    /// Grace tick on the first failure, `restart` on the second
    Debounced,
}

/// Remediation capability a watchdog invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remedy {
    Start,
    Restart,
}

impl std::fmt::Display for Remedy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Remedy::Start => write!(f, "start"),
            Remedy::Restart => write!(f, "restart"),
        }
    }
}

/// Result of a single watchdog tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogOutcome {
    /// Watchdog disabled or service in error state
    SkipNotApplicable,
    /// Another operation owns the service right now
    SkipInProgress,
    /// Probe passed
    SkipHealthy,
    /// First consecutive failure of a debounced watchdog
    WarnDebounced,
    /// A remediation was attempted
    Remediated { action: Remedy, ok: bool },
}

impl WatchdogOutcome {
    pub const fn acted(&self) -> bool {
        matches!(self, WatchdogOutcome::Remediated { .. })
    }
}

impl std::fmt::Display for WatchdogOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchdogOutcome::SkipNotApplicable => write!(f, "skipped (not applicable)"),
            WatchdogOutcome::SkipInProgress => write!(f, "skipped (in progress)"),
            WatchdogOutcome::SkipHealthy => write!(f, "healthy"),
            WatchdogOutcome::WarnDebounced => write!(f, "missed once, waiting"),
            WatchdogOutcome::Remediated { action, ok: true } => write!(f, "{action} succeeded"),
            WatchdogOutcome::Remediated { action, ok: false } => write!(f, "{action} failed"),
        }
    }
}

/// Liveness watchdog for one service.
pub struct Watchdog {
    id: WatchdogId,
    service: Arc<dyn Supervised>,
    probe: Probe,
    policy: Policy,
    enabled: bool,
    reset_when_failing: bool,
    cache: Arc<Mutex<DebounceCache>>,
}

impl Watchdog {
    /// Container watchdog that starts the service on the first miss.
    pub fn container(
        id: WatchdogId,
        service: Arc<dyn Supervised>,
        cache: Arc<Mutex<DebounceCache>>,
    ) -> Self {
        Self {
            id,
            service,
            probe: Probe::Container,
            policy: Policy::Immediate,
            enabled: true,
            reset_when_failing: false,
            cache,
        }
    }

    /// API watchdog that restarts the service after two consecutive misses.
    pub fn api(
        id: WatchdogId,
        service: Arc<dyn Supervised>,
        cache: Arc<Mutex<DebounceCache>>,
    ) -> Self {
        Self {
            id,
            service,
            probe: Probe::Api,
            policy: Policy::Debounced,
            enabled: true,
            reset_when_failing: false,
            cache,
        }
    }

    /// Global administrative switch, combined with the service's own flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Wipe the service's configuration before `start` when it reports a
    /// persistent failure.
    #[must_use]
    pub const fn with_reset_when_failing(mut self) -> Self {
        self.reset_when_failing = true;
        self
    }

    pub const fn id(&self) -> WatchdogId {
        self.id
    }

    /// Evaluate the service once and remediate if needed.
    pub async fn tick(&self) -> WatchdogOutcome {
        let name = self.service.name();

        if !self.enabled || !self.service.watchdog_enabled() || self.service.error_state() {
            trace!(service = name, watchdog = %self.id, "Watchdog not applicable");
            return WatchdogOutcome::SkipNotApplicable;
        }

        if self.service.in_progress() {
            debug!(service = name, watchdog = %self.id, "Operation in progress, watchdog skipped");
            return WatchdogOutcome::SkipInProgress;
        }

        let healthy = match self.probe {
            Probe::Container => self.service.is_running().await,
            Probe::Api => self.service.check_api_state().await,
        };

        if healthy {
            if self.policy == Policy::Debounced {
                lock(&self.cache).reset(self.id);
            }
            return WatchdogOutcome::SkipHealthy;
        }

        match self.policy {
            Policy::Immediate => self.revive().await,
            Policy::Debounced => self.debounced_restart().await,
        }
    }

    async fn revive(&self) -> WatchdogOutcome {
        let name = self.service.name();
        warn!(service = name, watchdog = %self.id, "Watchdog found a problem with {name}");

        if self.reset_when_failing && self.service.is_failing().await {
            warn!(service = name, "{name} is in a failure state, resetting configuration");
            settle(self.service.reset().await, "Watchdog reset before start failed");
        }

        let ok = settle(self.service.start().await, "Watchdog reanimation failed");
        WatchdogOutcome::Remediated {
            action: Remedy::Start,
            ok,
        }
    }

    async fn debounced_restart(&self) -> WatchdogOutcome {
        let name = self.service.name();
        let strikes = lock(&self.cache).record_failure(self.id);

        if strikes < STRIKES_BEFORE_ACTION {
            warn!(service = name, watchdog = %self.id, strikes, "Watchdog missed API response from {name}");
            return WatchdogOutcome::WarnDebounced;
        }

        error!(service = name, watchdog = %self.id, "Watchdog found a problem with the {name} API");

        // Clears the counter even if the restart future is dropped or panics.
        let _reset = ResetOnDrop {
            cache: &self.cache,
            id: self.id,
        };
        let ok = settle(self.service.restart().await, "Watchdog reanimation failed");
        WatchdogOutcome::Remediated {
            action: Remedy::Restart,
            ok,
        }
    }
}

struct ResetOnDrop<'a> {
    cache: &'a Mutex<DebounceCache>,
    id: WatchdogId,
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        lock(self.cache).reset(self.id);
    }
}

fn lock(cache: &Mutex<DebounceCache>) -> MutexGuard<'_, DebounceCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}
