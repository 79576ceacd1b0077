//! Default task intervals, in seconds.
//!
//! Grouped by task kind. Every value can be overridden under `[intervals]`
//! in the config file.

// ============================================================================
// Update checks
// ============================================================================

/// Supervisor self-update check. Just over 8 hours.
pub const UPDATE_SUPERVISOR_SECS: u64 = 29_100;

/// Add-on auto-update batch. 16 hours.
pub const UPDATE_ADDONS_SECS: u64 = 57_600;

pub const UPDATE_CLI_SECS: u64 = 28_100;

pub const UPDATE_DNS_SECS: u64 = 30_100;

pub const UPDATE_AUDIO_SECS: u64 = 30_200;

// ============================================================================
// Reloads
// ============================================================================

/// Add-on store repositories. 3 hours.
pub const RELOAD_STORE_SECS: u64 = 10_800;

/// Version manifest. 2 hours.
pub const RELOAD_UPDATER_SECS: u64 = 7_200;

/// Snapshot index. 20 hours.
pub const RELOAD_SNAPSHOTS_SECS: u64 = 72_000;

pub const RELOAD_HOST_SECS: u64 = 7_600;

/// Ingress sessions. Roughly 15 minutes.
pub const RELOAD_INGRESS_SECS: u64 = 930;

// ============================================================================
// Watchdogs
// ============================================================================

pub const WATCHDOG_CORE_CONTAINER_SECS: u64 = 15;

/// API probe. Two consecutive misses are needed before a restart, so the
/// worst-case detection time is twice this.
pub const WATCHDOG_CORE_API_SECS: u64 = 300;

pub const WATCHDOG_DNS_CONTAINER_SECS: u64 = 20;

pub const WATCHDOG_AUDIO_CONTAINER_SECS: u64 = 20;

pub const WATCHDOG_CLI_CONTAINER_SECS: u64 = 60;

// ============================================================================
// Validation bounds
// ============================================================================

/// Watchdog intervals above this are accepted but warned about.
pub const WATCHDOG_MAX_SUGGESTED_SECS: u64 = 3_600;

/// Update checks more frequent than this are accepted but warned about.
pub const UPDATE_MIN_SUGGESTED_SECS: u64 = 300;
