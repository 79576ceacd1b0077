//! Config validation: unknown-key detection with Levenshtein suggestions
//! and interval range checks.
//!
//! Two-pass parse: the raw TOML is first walked as a `toml::Value` tree and
//! every key is compared against the known set, producing "did you mean?"
//! warnings. Serde deserialization happens afterwards. Warnings never break
//! an existing config.

use std::collections::HashSet;

use super::defaults::{UPDATE_MIN_SUGGESTED_SECS, WATCHDOG_MAX_SUGGESTED_SECS};
use super::TasksConfig;
use crate::tasks::{TaskKind, TaskName};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of [`TasksConfig`].
///
/// Interval keys are derived from [`TaskName::ALL`], so a new catalog task
/// is picked up automatically.
pub fn known_config_keys() -> HashSet<String> {
    let mut keys: HashSet<String> = [
        "intervals",
        "updates",
        "updates.channel",
        "watchdog",
        "watchdog.enabled",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    for task in TaskName::ALL {
        keys.insert(format!("intervals.{}", task.config_key()));
    }
    keys
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively collect all dotted key paths of a `toml::Value` tree.
///
/// `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest known key within edit distance 3, if any.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.clone())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warn about every key in `raw_toml` that the config does not know.
///
/// Parse errors are left for serde to report.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Returns (errors, warnings). Errors must prevent startup; warnings are
/// suspicious but allowed.
pub fn validate_ranges(config: &TasksConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for task in TaskName::ALL {
        let secs = config.intervals.secs(task);
        let key = task.config_key();

        if secs == 0 {
            errors.push(format!("intervals.{key} = 0 (must be at least 1 second)"));
            continue;
        }

        match task.kind() {
            TaskKind::Watchdog if secs > WATCHDOG_MAX_SUGGESTED_SECS => {
                warnings.push(ValidationWarning {
                    field: format!("intervals.{key}"),
                    message: format!(
                        "intervals.{key} = {secs}s leaves the service unsupervised for over an hour"
                    ),
                    suggestion: None,
                });
            }
            TaskKind::Update if secs < UPDATE_MIN_SUGGESTED_SECS => {
                warnings.push(ValidationWarning {
                    field: format!("intervals.{key}"),
                    message: format!(
                        "intervals.{key} = {secs}s polls for updates more often than every {UPDATE_MIN_SUGGESTED_SECS}s"
                    ),
                    suggestion: None,
                });
            }
            _ => {}
        }
    }

    (errors, warnings)
}
