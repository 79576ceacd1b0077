//! Update-check tasks
//!
//! [`UpdateCheck`] handles a single updatable component; [`update_addons`]
//! fans out over every installed add-on. Neither ever returns an error: a
//! failed update is logged and the next tick tries again.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::settle;
use crate::config::Channel;
use crate::services::{AddonCatalog, Updatable};

/// Policy guard in front of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateGuard {
    /// Always update when a new version is available
    None,
    /// Refuse to update while running on the development channel
    NotOnDev(Channel),
}

impl UpdateGuard {
    const fn blocks(self) -> bool {
        matches!(self, UpdateGuard::NotOnDev(Channel::Dev))
    }
}

/// What a single update-check tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate,
    Blocked,
    Updated,
    Failed,
}

/// Update check bound to one component.
pub struct UpdateCheck {
    service: Arc<dyn Updatable>,
    guard: UpdateGuard,
}

impl UpdateCheck {
    pub fn new(service: Arc<dyn Updatable>) -> Self {
        Self {
            service,
            guard: UpdateGuard::None,
        }
    }

    #[must_use]
    pub fn with_guard(mut self, guard: UpdateGuard) -> Self {
        self.guard = guard;
        self
    }

    pub async fn run(&self) -> UpdateOutcome {
        let name = self.service.name();
        if !self.service.need_update() {
            return UpdateOutcome::UpToDate;
        }

        if self.guard.blocks() {
            warn!(service = name, "Ignoring {name} update on dev channel");
            return UpdateOutcome::Blocked;
        }

        info!(
            service = name,
            current = self.service.current_version().as_deref().unwrap_or("unknown"),
            latest = self.service.latest_version().as_deref().unwrap_or("unknown"),
            "Found new {name} version"
        );

        if settle(self.service.update().await, "Automatic update failed") {
            UpdateOutcome::Updated
        } else {
            UpdateOutcome::Failed
        }
    }
}

/// Per-tick tally of the add-on auto-update batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddonUpdateSummary {
    pub updated: Vec<String>,
    pub failed: Vec<String>,
    /// Rejected by the schema pre-check
    pub skipped: Vec<String>,
}

impl AddonUpdateSummary {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Update every installed, auto-updating add-on that is behind.
///
/// Eligible add-ons are updated concurrently and all of them are awaited
/// before returning. One failure (or panic) never affects its siblings.
pub async fn update_addons(catalog: &dyn AddonCatalog) -> AddonUpdateSummary {
    let mut summary = AddonUpdateSummary::default();
    let mut batch = JoinSet::new();

    for addon in catalog.all() {
        if !addon.is_installed() || !addon.auto_update() {
            continue;
        }
        match (addon.current_version(), addon.latest_version()) {
            (Some(current), Some(latest)) if current != latest => {}
            _ => continue,
        }

        let slug = addon.slug().to_string();
        if !addon.test_update_schema() {
            warn!(addon = %slug, "Add-on {slug} will be ignored, schema tests fail");
            summary.skipped.push(slug);
            continue;
        }

        batch.spawn(async move {
            let ok = match AssertUnwindSafe(addon.update()).catch_unwind().await {
                Ok(result) => settle(result, "Add-on auto update failed"),
                Err(_) => {
                    error!(addon = %slug, "Add-on auto update panicked");
                    false
                }
            };
            (slug, ok)
        });
    }

    if batch.is_empty() {
        return summary;
    }

    info!(tasks = batch.len(), "Add-on auto update process {} tasks", batch.len());

    while let Some(joined) = batch.join_next().await {
        match joined {
            Ok((slug, true)) => summary.updated.push(slug),
            Ok((slug, false)) => summary.failed.push(slug),
            Err(e) => error!(error = %e, "Add-on update task aborted"),
        }
    }

    info!(
        updated = summary.updated.len(),
        failed = summary.failed.len(),
        skipped = summary.skipped.len(),
        "Add-on auto update finished"
    );
    summary
}
