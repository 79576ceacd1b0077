//! Task Configuration Module
//!
//! Interval overrides, update channel and the global watchdog switch, loaded
//! once at startup from TOML. Intervals are fixed for the lifetime of the
//! process; there is no hot reload.
//!
//! ## Loading Order
//!
//! 1. `WARDEN_CONFIG` environment variable (path to TOML file)
//! 2. `warden.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Example
//!
//! ```toml
//! [intervals]
//! watchdog_core_api_secs = 120
//!
//! [updates]
//! channel = "beta"
//!
//! [watchdog]
//! enabled = true
//! ```

pub mod defaults;
pub mod validation;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::tasks::TaskName;

/// Environment variable pointing at the config file.
pub const CONFIG_ENV: &str = "WARDEN_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "warden.toml";

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error ({}): {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration of the task registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default)]
    pub intervals: IntervalConfig,

    #[serde(default)]
    pub updates: UpdateConfig,

    #[serde(default)]
    pub watchdog: WatchdogConfig,
}

impl TasksConfig {
    /// Load using the standard search order, falling back to defaults on
    /// any error.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded task config from {CONFIG_ENV}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded task config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load and validate a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // Unknown keys only warn; typos must never stop the supervisor.
        for w in validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject impossible values; log suspicious ones.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Intervals
// ============================================================================

/// Period of every catalog task, in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    pub update_supervisor_secs: u64,
    pub update_addons_secs: u64,
    pub update_cli_secs: u64,
    pub update_dns_secs: u64,
    pub update_audio_secs: u64,
    pub reload_store_secs: u64,
    pub reload_updater_secs: u64,
    pub reload_snapshots_secs: u64,
    pub reload_host_secs: u64,
    pub reload_ingress_secs: u64,
    pub watchdog_core_container_secs: u64,
    pub watchdog_core_api_secs: u64,
    pub watchdog_dns_container_secs: u64,
    pub watchdog_audio_container_secs: u64,
    pub watchdog_cli_container_secs: u64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            update_supervisor_secs: defaults::UPDATE_SUPERVISOR_SECS,
            update_addons_secs: defaults::UPDATE_ADDONS_SECS,
            update_cli_secs: defaults::UPDATE_CLI_SECS,
            update_dns_secs: defaults::UPDATE_DNS_SECS,
            update_audio_secs: defaults::UPDATE_AUDIO_SECS,
            reload_store_secs: defaults::RELOAD_STORE_SECS,
            reload_updater_secs: defaults::RELOAD_UPDATER_SECS,
            reload_snapshots_secs: defaults::RELOAD_SNAPSHOTS_SECS,
            reload_host_secs: defaults::RELOAD_HOST_SECS,
            reload_ingress_secs: defaults::RELOAD_INGRESS_SECS,
            watchdog_core_container_secs: defaults::WATCHDOG_CORE_CONTAINER_SECS,
            watchdog_core_api_secs: defaults::WATCHDOG_CORE_API_SECS,
            watchdog_dns_container_secs: defaults::WATCHDOG_DNS_CONTAINER_SECS,
            watchdog_audio_container_secs: defaults::WATCHDOG_AUDIO_CONTAINER_SECS,
            watchdog_cli_container_secs: defaults::WATCHDOG_CLI_CONTAINER_SECS,
        }
    }
}

impl IntervalConfig {
    /// Configured period of `task` in seconds.
    pub const fn secs(&self, task: TaskName) -> u64 {
        match task {
            TaskName::UpdateSupervisor => self.update_supervisor_secs,
            TaskName::UpdateAddons => self.update_addons_secs,
            TaskName::UpdateCli => self.update_cli_secs,
            TaskName::UpdateDns => self.update_dns_secs,
            TaskName::UpdateAudio => self.update_audio_secs,
            TaskName::ReloadStore => self.reload_store_secs,
            TaskName::ReloadUpdater => self.reload_updater_secs,
            TaskName::ReloadSnapshots => self.reload_snapshots_secs,
            TaskName::ReloadHost => self.reload_host_secs,
            TaskName::ReloadIngress => self.reload_ingress_secs,
            TaskName::WatchdogCoreContainer => self.watchdog_core_container_secs,
            TaskName::WatchdogCoreApi => self.watchdog_core_api_secs,
            TaskName::WatchdogDnsContainer => self.watchdog_dns_container_secs,
            TaskName::WatchdogAudioContainer => self.watchdog_audio_container_secs,
            TaskName::WatchdogCliContainer => self.watchdog_cli_container_secs,
        }
    }

    pub const fn interval(&self, task: TaskName) -> Duration {
        Duration::from_secs(self.secs(task))
    }
}

// ============================================================================
// Updates
// ============================================================================

/// Release channel the supervisor follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Stable,
    Beta,
    Dev,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Stable => write!(f, "stable"),
            Channel::Beta => write!(f, "beta"),
            Channel::Dev => write!(f, "dev"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Self-update is skipped on `dev`.
    pub channel: Channel,
}

// ============================================================================
// Watchdog
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Global switch, combined with each service's own watchdog flag.
    pub enabled: bool,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = TasksConfig::default();
        assert_eq!(config.intervals.secs(TaskName::UpdateSupervisor), 29_100);
        assert_eq!(config.intervals.secs(TaskName::ReloadIngress), 930);
        assert_eq!(
            config.intervals.interval(TaskName::WatchdogCoreContainer),
            Duration::from_secs(15)
        );
        assert_eq!(config.updates.channel, Channel::Stable);
        assert!(config.watchdog.enabled);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config: TasksConfig = toml::from_str(
            r#"
[intervals]
watchdog_core_api_secs = 120

[updates]
channel = "dev"
"#,
        )
        .unwrap();

        assert_eq!(config.intervals.watchdog_core_api_secs, 120);
        assert_eq!(config.intervals.watchdog_dns_container_secs, 20);
        assert_eq!(config.updates.channel, Channel::Dev);
        assert!(config.watchdog.enabled);
    }

    #[test]
    fn test_zero_interval_fails_validation() {
        let mut config = TasksConfig::default();
        config.intervals.reload_host_secs = 0;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("reload_host_secs"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_channel_is_parse_error() {
        let result: Result<TasksConfig, _> = toml::from_str("[updates]\nchannel = \"nightly\"\n");
        assert!(result.is_err());
    }
}
