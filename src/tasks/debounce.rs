//! Debounce cache for watchdogs that need a grace tick before acting.
//!
//! Each entry is a saturating consecutive-failure counter used as a gate,
//! not a history: it only has to tell "first miss" apart from "missed
//! again".

use std::collections::HashMap;

/// Identifies the watchdog owning a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchdogId {
    CoreContainer,
    CoreApi,
    DnsContainer,
    AudioContainer,
    CliContainer,
}

impl std::fmt::Display for WatchdogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchdogId::CoreContainer => write!(f, "core-container"),
            WatchdogId::CoreApi => write!(f, "core-api"),
            WatchdogId::DnsContainer => write!(f, "dns-container"),
            WatchdogId::AudioContainer => write!(f, "audio-container"),
            WatchdogId::CliContainer => write!(f, "cli-container"),
        }
    }
}

/// Consecutive failures needed before a debounced watchdog acts.
pub const STRIKES_BEFORE_ACTION: u8 = 2;

#[derive(Debug, Default)]
pub struct DebounceCache {
    retries: HashMap<WatchdogId, u8>,
}

impl DebounceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter; absent entries read as 0.
    pub fn get(&self, id: WatchdogId) -> u8 {
        self.retries.get(&id).copied().unwrap_or(0)
    }

    /// Count one more failed observation and return the new value.
    ///
    /// Saturates at [`STRIKES_BEFORE_ACTION`].
    pub fn record_failure(&mut self, id: WatchdogId) -> u8 {
        let entry = self.retries.entry(id).or_insert(0);
        *entry = entry.saturating_add(1).min(STRIKES_BEFORE_ACTION);
        *entry
    }

    pub fn reset(&mut self, id: WatchdogId) {
        self.retries.insert(id, 0);
    }
}
