//! Managed-service capability interfaces
//!
//! The core never talks to containers, HTTP APIs or update servers directly.
//! Every managed service is reached through the narrow capability traits in
//! this module, and each proxy implements only the subsets it supports:
//!
//! - [`Liveness`]: health probes and the guard flags the watchdog reads
//! - [`Remediable`]: start / restart / reset actions
//! - [`Updatable`]: version comparison and self-update
//! - [`Reloadable`]: periodic metadata reload
//! - [`AddonCatalog`] / [`Addon`]: installed add-ons for batch auto-update
//!
//! All action capabilities return [`ServiceError`] on failure. Callers in
//! `crate::tasks` log these and continue.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// Error Type
// ============================================================================

/// Failure raised by a managed-service action capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{service} failed to start: {reason}")]
    Start { service: String, reason: String },

    #[error("{service} failed to restart: {reason}")]
    Restart { service: String, reason: String },

    #[error("{service} failed to reset its configuration: {reason}")]
    Reset { service: String, reason: String },

    #[error("{service} update to {version} failed: {reason}")]
    Update {
        service: String,
        version: String,
        reason: String,
    },

    #[error("{service} reload failed: {reason}")]
    Reload { service: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ServiceError>;

// ============================================================================
// Capability Traits
// ============================================================================

/// Liveness signals of a supervised service.
///
/// `in_progress`, `error_state` and `watchdog_enabled` are plain reads; the
/// probes may suspend.
#[async_trait]
pub trait Liveness: Send + Sync {
    /// Human-readable service name for logs.
    fn name(&self) -> &str;

    /// Per-service watchdog switch. Services without one are always watched.
    fn watchdog_enabled(&self) -> bool {
        true
    }

    /// Hard error state. Terminal until cleared outside the watchdog.
    fn error_state(&self) -> bool {
        false
    }

    /// A start, restart, reset or update on this service is underway.
    fn in_progress(&self) -> bool;

    /// Container-level probe.
    async fn is_running(&self) -> bool;

    /// Persistent failure state (e.g. a crash-looping plugin).
    async fn is_failing(&self) -> bool {
        false
    }

    /// Application API probe. Services without an API report their
    /// container state.
    async fn check_api_state(&self) -> bool {
        self.is_running().await
    }
}

/// Remediation actions of a supervised service.
#[async_trait]
pub trait Remediable: Send + Sync {
    async fn start(&self) -> Result<()>;

    async fn restart(&self) -> Result<()>;

    /// Wipe the service's generated configuration.
    async fn reset(&self) -> Result<()> {
        Ok(())
    }
}

/// A service the watchdog can both observe and remediate.
pub trait Supervised: Liveness + Remediable {}

impl<T: Liveness + Remediable + ?Sized> Supervised for T {}

/// Version tracking and update of a single component.
#[async_trait]
pub trait Updatable: Send + Sync {
    fn name(&self) -> &str;

    fn current_version(&self) -> Option<String>;

    fn latest_version(&self) -> Option<String>;

    /// True when both versions are known and differ.
    fn need_update(&self) -> bool {
        match (self.current_version(), self.latest_version()) {
            (Some(current), Some(latest)) => current != latest,
            _ => false,
        }
    }

    async fn update(&self) -> Result<()>;
}

/// A plugin is supervised by a container watchdog and auto-updated.
pub trait Plugin: Supervised + Updatable {}

impl<T: Supervised + Updatable + ?Sized> Plugin for T {}

/// A component whose metadata is refreshed periodically.
#[async_trait]
pub trait Reloadable: Send + Sync {
    fn name(&self) -> &str;

    async fn reload(&self) -> Result<()>;
}

/// One add-on as seen by the auto-update task.
#[async_trait]
pub trait Addon: Send + Sync {
    fn slug(&self) -> &str;

    fn is_installed(&self) -> bool;

    fn auto_update(&self) -> bool;

    fn current_version(&self) -> Option<String>;

    fn latest_version(&self) -> Option<String>;

    /// Whether the current options still validate against the schema of
    /// the latest version.
    fn test_update_schema(&self) -> bool;

    async fn update(&self) -> Result<()>;
}

/// Source of every known add-on.
pub trait AddonCatalog: Send + Sync {
    fn all(&self) -> Vec<Arc<dyn Addon>>;
}

// ============================================================================
// Service Set
// ============================================================================

/// Every proxy the task registry binds to.
#[derive(Clone)]
pub struct Services {
    /// Primary application (container and API watchdogs, no auto-update)
    pub core: Arc<dyn Supervised>,
    /// The supervisor's own self-update
    pub supervisor: Arc<dyn Updatable>,
    pub cli: Arc<dyn Plugin>,
    pub dns: Arc<dyn Plugin>,
    pub audio: Arc<dyn Plugin>,
    pub addons: Arc<dyn AddonCatalog>,
    pub store: Arc<dyn Reloadable>,
    pub updater: Arc<dyn Reloadable>,
    pub snapshots: Arc<dyn Reloadable>,
    pub host: Arc<dyn Reloadable>,
    pub ingress: Arc<dyn Reloadable>,
}
