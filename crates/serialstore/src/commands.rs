// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI command implementations.
//!
//! Each command is one coordinated operation: writes run inside the
//! coordinator's implicit transaction, reads on a read-only handle.

use serialstore_config::SerialStoreConfig;
use serialstore_coordinator::TransactionCoordinator;
use serialstore_core::StoreError;
use serialstore_sqlite::{
    SortDescriptor, SqliteEngine, count_objects, delete_all_objects, delete_object,
    get_all_objects, get_object, get_or_create_object, save_object,
};

use crate::entry::Entry;

pub type Store = TransactionCoordinator<SqliteEngine>;

/// Starts a coordinator over the configured database.
pub fn open_store(config: &SerialStoreConfig) -> Result<Store, StoreError> {
    let engine = SqliteEngine::new(config.store.clone());
    TransactionCoordinator::from_config(engine, None, &config.coordinator)
        .map_err(StoreError::other)
}

/// Stores `value` under `key`, returning the previous value if there was one.
pub async fn put(store: &Store, key: String, value: String) -> Result<Option<String>, StoreError> {
    store
        .try_write_async(move |h| {
            let previous = get_object::<Entry>(h, &key)?.map(|e| e.value);
            save_object(h, &Entry::new(key, value))?;
            Ok::<_, StoreError>(previous)
        })
        .await
}

pub async fn get(store: &Store, key: String) -> Result<Option<Entry>, StoreError> {
    store
        .try_read_async(move |h| get_object::<Entry>(h, &key))
        .await
}

/// Appends `suffix` to the value under `key`, creating an empty entry first
/// if needed. Returns the new value.
pub async fn append(store: &Store, key: String, suffix: String) -> Result<String, StoreError> {
    store
        .try_write_async(move |h| {
            let mut entry = get_or_create_object::<Entry>(h, Some(key))?;
            entry.value.push_str(&suffix);
            save_object(h, &entry)?;
            Ok::<_, StoreError>(entry.value)
        })
        .await
}

/// Entries sorted by key, optionally only those mentioning `filter`.
pub async fn list(
    store: &Store,
    filter: Option<String>,
    descending: bool,
) -> Result<Vec<Entry>, StoreError> {
    store
        .try_read_async(move |h| {
            let keep = |e: &Entry| filter.as_deref().is_none_or(|needle| e.mentions(needle));
            let by_key = if descending {
                SortDescriptor::descending(|e: &Entry| e.key.clone())
            } else {
                SortDescriptor::ascending(|e: &Entry| e.key.clone())
            };
            get_all_objects::<Entry>(h, Some(&keep), Some(&[by_key][..]))
        })
        .await
}

/// Returns whether an entry was removed.
pub async fn delete(store: &Store, key: String) -> Result<bool, StoreError> {
    store
        .try_write_async(move |h| delete_object::<Entry>(h, &key))
        .await
}

/// Removes every entry, returning how many there were.
pub async fn clear(store: &Store) -> Result<usize, StoreError> {
    store.try_write_async(delete_all_objects::<Entry>).await
}

pub async fn count(store: &Store) -> Result<usize, StoreError> {
    store.try_read_async(count_objects::<Entry>).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialstore_config::StoreConfig;

    fn store(dir: &tempfile::TempDir) -> Store {
        let mut config = SerialStoreConfig::default();
        config.store = StoreConfig {
            database_path: dir.path().join("cli.db").display().to_string(),
            ..StoreConfig::default()
        };
        config.coordinator.worker_name = "cli-test-worker".to_string();
        open_store(&config).unwrap()
    }

    #[tokio::test]
    async fn put_get_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert_eq!(store.worker().name(), "cli-test-worker");

        assert_eq!(put(&store, "k".into(), "v1".into()).await.unwrap(), None);
        assert_eq!(
            put(&store, "k".into(), "v2".into()).await.unwrap(),
            Some("v1".to_string())
        );
        assert_eq!(
            get(&store, "k".into()).await.unwrap(),
            Some(Entry::new("k", "v2"))
        );
        assert_eq!(get(&store, "missing".into()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_filters_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        for (k, v) in [("b", "banana"), ("a", "apple"), ("c", "cherry")] {
            put(&store, k.into(), v.into()).await.unwrap();
        }

        let keys = |entries: Vec<Entry>| entries.into_iter().map(|e| e.key).collect::<Vec<_>>();
        assert_eq!(keys(list(&store, None, false).await.unwrap()), ["a", "b", "c"]);
        assert_eq!(keys(list(&store, None, true).await.unwrap()), ["c", "b", "a"]);
        assert_eq!(
            keys(list(&store, Some("an".into()), false).await.unwrap()),
            ["b"]
        );
    }

    #[tokio::test]
    async fn append_creates_then_extends() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert_eq!(append(&store, "log".into(), "a".into()).await.unwrap(), "a");
        assert_eq!(append(&store, "log".into(), "b".into()).await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        for k in ["x", "y", "z"] {
            put(&store, k.into(), "1".into()).await.unwrap();
        }

        assert!(delete(&store, "x".into()).await.unwrap());
        assert!(!delete(&store, "x".into()).await.unwrap());
        assert_eq!(count(&store).await.unwrap(), 2);
        assert_eq!(clear(&store).await.unwrap(), 2);
        assert_eq!(count(&store).await.unwrap(), 0);
    }
}
