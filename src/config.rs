//! Process-wide engine configuration.
//!
//! The configuration starts with built-in defaults and changes only through
//! an explicit [`configure`] call; [`reset_config`] restores the defaults.
//! Read and write operations never mutate it. Operations take a snapshot
//! ([`Config::current`]) or an operation-local override supplied through
//! their options, so an override never leaks into other operations.
//!
//! Like the converter registry, the global configuration is deliberately
//! process-wide mutable state. Callers must not reconfigure it while
//! operations that depend on it are in flight; the engine does not serialize
//! those calls against running reads or writes.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Engine-wide defaults that govern parsing and formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// chrono pattern used by the date converter when a field declares no
    /// `format` of its own.
    pub date_format: String,

    /// Trim surrounding whitespace from text cells on read.
    pub trim_values: bool,

    /// Skip rows whose cells are all blank instead of decoding them as a
    /// record of defaults/nulls.
    pub skip_empty_rows: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
            trim_values: true,
            skip_empty_rows: true,
        }
    }
}

static GLOBAL: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));

impl Config {
    /// Snapshot of the current process-wide configuration.
    pub fn current() -> Config {
        GLOBAL.read().expect("config lock poisoned").clone()
    }
}

/// Replace the process-wide configuration.
pub fn configure(config: Config) {
    *GLOBAL.write().expect("config lock poisoned") = config;
}

/// Restore the built-in defaults.
pub fn reset_config() {
    configure(Config::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.date_format, "%Y-%m-%d");
        assert!(c.trim_values);
        assert!(c.skip_empty_rows);
    }

    #[test]
    fn test_configure_and_reset() {
        configure(Config {
            date_format: "%d/%m/%Y".into(),
            ..Config::default()
        });
        assert_eq!(Config::current().date_format, "%d/%m/%Y");

        reset_config();
        assert_eq!(Config::current(), Config::default());
    }
}
