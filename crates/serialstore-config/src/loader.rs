// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./serialstore.toml` > `~/.config/serialstore/serialstore.toml`
//! > `/etc/serialstore/serialstore.toml` with environment variable overrides via the
//! `SERIALSTORE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SerialStoreConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/serialstore/serialstore.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "serialstore.toml";

/// Per-user configuration file under the XDG config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("serialstore/serialstore.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/serialstore/serialstore.toml` (system-wide)
/// 3. `~/.config/serialstore/serialstore.toml` (user XDG config)
/// 4. `./serialstore.toml` (local directory)
/// 5. `SERIALSTORE_*` environment variables
pub fn load_config() -> Result<SerialStoreConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
pub fn load_config_from_str(toml_content: &str) -> Result<SerialStoreConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SerialStoreConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SerialStoreConfig, figment::Error> {
    tracing::debug!(path = %path.display(), "loading configuration file");
    Figment::new()
        .merge(Serialized::defaults(SerialStoreConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The layered Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SerialStoreConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider with explicit section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `SERIALSTORE_STORE_BUSY_TIMEOUT_MS` must map to
/// `store.busy_timeout_ms`, not `store.busy.timeout.ms`.
pub fn env_provider() -> Env {
    Env::prefixed("SERIALSTORE_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to its config key.
pub fn map_env_key(key: &str) -> String {
    for section in ["store", "coordinator", "logging"] {
        if let Some(field) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{field}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("store_busy_timeout_ms"), "store.busy_timeout_ms");
        assert_eq!(map_env_key("store_database_path"), "store.database_path");
        assert_eq!(map_env_key("coordinator_worker_name"), "coordinator.worker_name");
        assert_eq!(map_env_key("logging_log_level"), "logging.log_level");
    }

    #[test]
    fn unmapped_env_keys_pass_through() {
        assert_eq!(map_env_key("storage_path"), "storage_path");
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serialstore.toml");
        std::fs::write(&path, "[store]\nbusy_timeout_ms = 250\n").unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.store.busy_timeout_ms, 250);
        assert!(config.store.wal_mode);
    }
}
