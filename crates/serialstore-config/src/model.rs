// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for SerialStore.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Log levels accepted by `[logging] log_level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Top-level SerialStore configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SerialStoreConfig {
    /// Store location and SQLite connection settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Transaction coordinator settings.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Store location and per-connection settings.
///
/// Doubles as the handle configuration of the SQLite engine: every handle the
/// coordinator opens is opened with these values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a connection waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("serialstore/serialstore.db").display().to_string())
        .unwrap_or_else(|| "serialstore.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Transaction coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Name of the worker thread all serialized operations run on.
    #[serde(default = "default_worker_name")]
    pub worker_name: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            worker_name: default_worker_name(),
        }
    }
}

fn default_worker_name() -> String {
    "serialstore-worker".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config: SerialStoreConfig = toml::from_str("").unwrap();
        assert!(config.store.wal_mode);
        assert_eq!(config.store.busy_timeout_ms, 5_000);
        assert!(config.store.database_path.ends_with("serialstore.db"));
        assert_eq!(config.coordinator.worker_name, "serialstore-worker");
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: SerialStoreConfig = toml::from_str(
            r#"
[store]
wal_mode = false
"#,
        )
        .unwrap();
        assert!(!config.store.wal_mode);
        assert_eq!(config.store.busy_timeout_ms, 5_000);
    }

    #[test]
    fn unknown_section_is_rejected() {
        let result = toml::from_str::<SerialStoreConfig>("[agent]\nname = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_field_in_section_is_rejected() {
        let result = toml::from_str::<SerialStoreConfig>("[coordinator]\nworkers = 2\n");
        assert!(result.is_err());
    }
}
