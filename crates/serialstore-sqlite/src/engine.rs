// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the store engine.
//!
//! Every handle owns its own `rusqlite::Connection`. The coordinator opens one
//! per operation on the thread that uses it, so nothing here is shared across
//! threads except the engine's record of which databases have been migrated.

use std::cell::Cell;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::debug;

use serialstore_config::model::StoreConfig;
use serialstore_core::{BoxError, StoreEngine, StoreHandle};

use crate::migrations;

/// Opens SQLite connections configured from a [`StoreConfig`].
///
/// Handles may be opened with a different `StoreConfig` than the one the
/// engine was built with; migrations run once per distinct database path.
/// `:memory:` paths give every handle a separate database and are only
/// useful for single-handle work.
pub struct SqliteEngine {
    config: StoreConfig,
    migrated: Mutex<HashSet<String>>,
}

impl SqliteEngine {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            migrated: Mutex::new(HashSet::new()),
        }
    }

    /// Convenience constructor for a database file with default settings.
    pub fn at_path(path: impl AsRef<Path>) -> Self {
        Self::new(StoreConfig {
            database_path: path.as_ref().display().to_string(),
            ..StoreConfig::default()
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn connect(
        &self,
        configuration: Option<&StoreConfig>,
        read_only: bool,
    ) -> Result<SqliteHandle, BoxError> {
        let config = configuration.unwrap_or(&self.config);
        let path = Path::new(&config.database_path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        if config.wal_mode {
            let mode: String =
                conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            debug!(journal_mode = %mode, "journal mode set");
        }

        {
            let mut migrated = self.migrated.lock();
            if !migrated.contains(&config.database_path) {
                migrations::run_migrations(&mut conn)?;
                migrated.insert(config.database_path.clone());
                debug!(path = %config.database_path, "database migrated");
            }
        }

        if read_only {
            conn.execute_batch("PRAGMA query_only = ON")?;
        }

        debug!(path = %config.database_path, read_only, "SQLite handle opened");
        Ok(SqliteHandle {
            conn,
            read_only,
            data_version: Cell::new(None),
        })
    }
}

impl StoreEngine for SqliteEngine {
    type Handle = SqliteHandle;
    type Configuration = StoreConfig;

    fn open(&self, configuration: Option<&StoreConfig>) -> Result<SqliteHandle, BoxError> {
        self.connect(configuration, false)
    }

    fn open_read_only(
        &self,
        configuration: Option<&StoreConfig>,
    ) -> Result<SqliteHandle, BoxError> {
        self.connect(configuration, true)
    }
}

/// A connection confined to the thread that opened it.
pub struct SqliteHandle {
    conn: Connection,
    read_only: bool,
    data_version: Cell<Option<i64>>,
}

impl SqliteHandle {
    /// The underlying connection, for queries the record helpers do not cover.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Whether the connection was opened with `query_only` set.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl StoreHandle for SqliteHandle {
    fn refresh(&self) -> Result<(), BoxError> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA data_version", [], |row| row.get(0))?;
        if let Some(previous) = self.data_version.replace(Some(version))
            && previous != version
        {
            debug!(previous, version, "database changed by another connection");
        }
        Ok(())
    }

    fn begin_transaction(&self) -> Result<(), BoxError> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit_transaction(&self) -> Result<(), BoxError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback_transaction(&self) -> Result<(), BoxError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn is_in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn engine(dir: &tempfile::TempDir) -> SqliteEngine {
        SqliteEngine::at_path(dir.path().join("store.db"))
    }

    #[test]
    fn transaction_state_follows_autocommit() {
        let dir = tempfile::tempdir().unwrap();
        let handle = engine(&dir).open(None).unwrap();

        assert!(!handle.is_in_transaction());
        handle.begin_transaction().unwrap();
        assert!(handle.is_in_transaction());
        handle.commit_transaction().unwrap();
        assert!(!handle.is_in_transaction());
    }

    #[test]
    fn rollback_discards_changes() {
        let dir = tempfile::tempdir().unwrap();
        let handle = engine(&dir).open(None).unwrap();

        handle.begin_transaction().unwrap();
        handle
            .connection()
            .execute(
                "INSERT INTO records (kind, key, body) VALUES ('t', 'k', '{}')",
                [],
            )
            .unwrap();
        handle.rollback_transaction().unwrap();

        let count: i64 = handle
            .connection()
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn read_only_handles_reject_writes() {
        let dir = tempfile::tempdir().unwrap();
        let handle = engine(&dir).open_read_only(None).unwrap();
        assert!(handle.is_read_only());

        let result = handle.connection().execute(
            "INSERT INTO records (kind, key, body) VALUES ('t', 'k', '{}')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn wal_mode_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let handle = engine(&dir).open(None).unwrap();
        let mode: String = handle
            .connection()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    #[traced_test]
    fn refresh_tracks_commits_from_other_connections() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        let reader = engine.open_read_only(None).unwrap();
        let writer = engine.open(None).unwrap();

        reader.refresh().unwrap();
        let before = reader.data_version.get();
        writer
            .connection()
            .execute(
                "INSERT INTO records (kind, key, body) VALUES ('t', 'k', '{}')",
                [],
            )
            .unwrap();
        reader.refresh().unwrap();
        assert_ne!(reader.data_version.get(), before);
        assert!(logs_contain("database changed by another connection"));
    }

    #[test]
    fn open_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SqliteEngine::at_path(dir.path().join("nested/deeper/store.db"));
        assert!(engine.open(None).is_ok());
    }

    #[test]
    fn unopenable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let engine = SqliteEngine::at_path(dir.path());
        assert!(engine.open(None).is_err());
    }
}
