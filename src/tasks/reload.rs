//! Periodic reload of components that only refresh their own metadata.

use std::sync::Arc;

use tracing::debug;

use super::settle;
use crate::services::Reloadable;

pub struct ReloadTask {
    component: Arc<dyn Reloadable>,
}

impl ReloadTask {
    pub fn new(component: Arc<dyn Reloadable>) -> Self {
        Self { component }
    }

    /// Returns whether the reload succeeded; failures are already logged.
    pub async fn run(&self) -> bool {
        debug!(component = self.component.name(), "Reloading");
        settle(self.component.reload().await, "Scheduled reload failed")
    }
}
