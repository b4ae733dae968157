// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record CRUD helpers over a handle.
//!
//! Helpers that write expect to run inside a coordinator write, where the
//! handle already holds the transaction; on a read-only handle they fail.

use rusqlite::{OptionalExtension, params};

use serialstore_core::StoreError;

use crate::engine::SqliteHandle;
use crate::record::Record;
use crate::sort::{SortDescriptor, combine};

/// Optional in-memory filter applied after fetching.
pub type Predicate<'a, R> = Option<&'a dyn Fn(&R) -> bool>;

fn decode<R: Record>(body: &str) -> Result<R, StoreError> {
    serde_json::from_str(body).map_err(StoreError::other)
}

fn refine<R: Record>(
    mut objects: Vec<R>,
    predicate: Predicate<'_, R>,
    sort: Option<&[SortDescriptor<R>]>,
) -> Vec<R> {
    if let Some(keep) = predicate {
        objects.retain(|o| keep(o));
    }
    if let Some(descriptors) = sort {
        objects.sort_by(combine(descriptors));
    }
    objects
}

/// Fetch one record by primary key.
pub fn get_object<R: Record>(
    handle: &SqliteHandle,
    key: &R::Key,
) -> Result<Option<R>, StoreError> {
    let body: Option<String> = handle
        .connection()
        .query_row(
            "SELECT body FROM records WHERE kind = ?1 AND key = ?2",
            params![R::KIND, key],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::other)?;
    body.as_deref().map(decode::<R>).transpose()
}

/// Fetch the records with the given keys.
///
/// Keys with no record are skipped. Results follow `keys` order unless `sort`
/// is given; `predicate` is applied before sorting.
pub fn get_objects<R: Record>(
    handle: &SqliteHandle,
    keys: &[R::Key],
    predicate: Predicate<'_, R>,
    sort: Option<&[SortDescriptor<R>]>,
) -> Result<Vec<R>, StoreError> {
    let mut stmt = handle
        .connection()
        .prepare_cached("SELECT body FROM records WHERE kind = ?1 AND key = ?2")
        .map_err(StoreError::other)?;

    let mut objects = Vec::with_capacity(keys.len());
    for key in keys {
        let body: Option<String> = stmt
            .query_row(params![R::KIND, key], |row| row.get(0))
            .optional()
            .map_err(StoreError::other)?;
        if let Some(body) = body {
            objects.push(decode(&body)?);
        }
    }
    Ok(refine(objects, predicate, sort))
}

/// Fetch every record of kind `R`, in insertion order unless sorted.
pub fn get_all_objects<R: Record>(
    handle: &SqliteHandle,
    predicate: Predicate<'_, R>,
    sort: Option<&[SortDescriptor<R>]>,
) -> Result<Vec<R>, StoreError> {
    let mut stmt = handle
        .connection()
        .prepare_cached("SELECT body FROM records WHERE kind = ?1 ORDER BY rowid")
        .map_err(StoreError::other)?;
    let bodies = stmt
        .query_map(params![R::KIND], |row| row.get::<_, String>(0))
        .map_err(StoreError::other)?;

    let mut objects = Vec::new();
    for body in bodies {
        objects.push(decode(&body.map_err(StoreError::other)?)?);
    }
    Ok(refine(objects, predicate, sort))
}

/// Insert `object`, replacing any record of the same kind and key.
pub fn save_object<R: Record>(handle: &SqliteHandle, object: &R) -> Result<(), StoreError> {
    let body = serde_json::to_string(object).map_err(StoreError::other)?;
    handle
        .connection()
        .execute(
            "INSERT INTO records (kind, key, body) VALUES (?1, ?2, ?3)
             ON CONFLICT (kind, key) DO UPDATE SET body = excluded.body",
            params![R::KIND, object.key(), body],
        )
        .map_err(StoreError::other)?;
    Ok(())
}

/// Return the record stored under `key`, creating a default one if absent.
///
/// Without a key, the key `R::default()` carries is used. An existing record
/// is never overwritten.
pub fn get_or_create_object<R: Record>(
    handle: &SqliteHandle,
    key: Option<R::Key>,
) -> Result<R, StoreError> {
    let key = key.unwrap_or_else(|| R::default().key());

    if let Some(existing) = get_object::<R>(handle, &key)? {
        return Ok(existing);
    }
    let mut object = R::default();
    object.set_key(key);
    save_object(handle, &object)?;
    Ok(object)
}

/// The first record of kind `R`, created from `R::default()` if there is none.
pub fn get_unique_instance_object<R: Record>(handle: &SqliteHandle) -> Result<R, StoreError> {
    let body: Option<String> = handle
        .connection()
        .query_row(
            "SELECT body FROM records WHERE kind = ?1 ORDER BY rowid LIMIT 1",
            params![R::KIND],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::other)?;
    match body {
        Some(body) => decode(&body),
        None => {
            let object = R::default();
            save_object(handle, &object)?;
            Ok(object)
        }
    }
}

/// Delete one record. Returns whether it existed.
pub fn delete_object<R: Record>(handle: &SqliteHandle, key: &R::Key) -> Result<bool, StoreError> {
    let deleted = handle
        .connection()
        .execute(
            "DELETE FROM records WHERE kind = ?1 AND key = ?2",
            params![R::KIND, key],
        )
        .map_err(StoreError::other)?;
    Ok(deleted > 0)
}

/// Delete every record of kind `R`. Returns how many were removed.
pub fn delete_all_objects<R: Record>(handle: &SqliteHandle) -> Result<usize, StoreError> {
    handle
        .connection()
        .execute("DELETE FROM records WHERE kind = ?1", params![R::KIND])
        .map_err(StoreError::other)
}

pub fn count_objects<R: Record>(handle: &SqliteHandle) -> Result<usize, StoreError> {
    let count: i64 = handle
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM records WHERE kind = ?1",
            params![R::KIND],
            |row| row.get(0),
        )
        .map_err(StoreError::other)?;
    usize::try_from(count).map_err(StoreError::other)
}

/// Primary keys of `objects`, in order.
pub fn primary_keys<R: Record>(objects: &[R]) -> Vec<R::Key> {
    objects.iter().map(R::key).collect()
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serialstore_core::{ErrorKind, StoreEngine, StoreHandle};

    use super::*;
    use crate::engine::SqliteEngine;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: i64,
        text: String,
    }

    impl Record for Note {
        const KIND: &'static str = "note";
        type Key = i64;

        fn key(&self) -> i64 {
            self.id
        }

        fn set_key(&mut self, key: i64) {
            self.id = key;
        }
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Settings {
        theme: String,
    }

    impl Record for Settings {
        const KIND: &'static str = "settings";
        type Key = String;

        fn key(&self) -> String {
            "singleton".to_string()
        }

        fn set_key(&mut self, _key: String) {}
    }

    fn note(id: i64, text: &str) -> Note {
        Note {
            id,
            text: text.to_string(),
        }
    }

    fn open(dir: &tempfile::TempDir) -> SqliteHandle {
        SqliteEngine::at_path(dir.path().join("queries.db"))
            .open(None)
            .unwrap()
    }

    #[test]
    fn save_then_get_and_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let h = open(&dir);

        save_object(&h, &note(1, "first")).unwrap();
        assert_eq!(get_object::<Note>(&h, &1).unwrap(), Some(note(1, "first")));

        save_object(&h, &note(1, "edited")).unwrap();
        assert_eq!(count_objects::<Note>(&h).unwrap(), 1);
        assert_eq!(get_object::<Note>(&h, &1).unwrap().unwrap().text, "edited");
        assert_eq!(get_object::<Note>(&h, &2).unwrap(), None);
    }

    #[test]
    fn get_objects_skips_missing_and_keeps_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let h = open(&dir);
        for n in [note(1, "a"), note(2, "b"), note(3, "c")] {
            save_object(&h, &n).unwrap();
        }

        let found = get_objects::<Note>(&h, &[3, 99, 1], None, None).unwrap();
        assert_eq!(primary_keys(&found), vec![3, 1]);
    }

    #[test]
    fn get_objects_filters_then_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let h = open(&dir);
        for n in [note(1, "keep b"), note(2, "drop"), note(3, "keep a")] {
            save_object(&h, &n).unwrap();
        }

        let keep = |n: &Note| n.text.starts_with("keep");
        let sort = [SortDescriptor::ascending(|n: &Note| n.text.clone())];
        let found = get_objects::<Note>(&h, &[1, 2, 3], Some(&keep), Some(&sort[..])).unwrap();
        assert_eq!(primary_keys(&found), vec![3, 1]);
    }

    #[test]
    fn get_all_objects_is_scoped_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let h = open(&dir);
        save_object(&h, &note(2, "b")).unwrap();
        save_object(&h, &note(1, "a")).unwrap();
        save_object(
            &h,
            &Settings {
                theme: "dark".to_string(),
            },
        )
        .unwrap();

        let all = get_all_objects::<Note>(&h, None, None).unwrap();
        assert_eq!(primary_keys(&all), vec![2, 1], "insertion order");

        let by_id_desc = [SortDescriptor::descending(|n: &Note| n.id)];
        let sorted = get_all_objects::<Note>(&h, None, Some(&by_id_desc[..])).unwrap();
        assert_eq!(primary_keys(&sorted), vec![2, 1]);
        assert_eq!(count_objects::<Settings>(&h).unwrap(), 1);
    }

    #[test]
    fn get_or_create_returns_existing_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let h = open(&dir);
        save_object(&h, &note(5, "kept")).unwrap();

        assert_eq!(get_or_create_object::<Note>(&h, Some(5)).unwrap().text, "kept");
        let created = get_or_create_object::<Note>(&h, Some(6)).unwrap();
        assert_eq!(created, note(6, ""));
        assert!(get_object::<Note>(&h, &6).unwrap().is_some());

        let keyless = get_or_create_object::<Note>(&h, None).unwrap();
        assert_eq!(keyless.id, 0);
        assert_eq!(count_objects::<Note>(&h).unwrap(), 3);
    }

    #[test]
    fn keyless_get_or_create_keeps_stored_default_key_record() {
        let dir = tempfile::tempdir().unwrap();
        let h = open(&dir);
        save_object(&h, &note(0, "precious")).unwrap();

        let found = get_or_create_object::<Note>(&h, None).unwrap();
        assert_eq!(found, note(0, "precious"));
        assert_eq!(
            get_object::<Note>(&h, &0).unwrap(),
            Some(note(0, "precious"))
        );
        assert_eq!(count_objects::<Note>(&h).unwrap(), 1);
    }

    #[test]
    fn unique_instance_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let h = open(&dir);

        let first = get_unique_instance_object::<Settings>(&h).unwrap();
        assert_eq!(first, Settings::default());
        save_object(
            &h,
            &Settings {
                theme: "light".to_string(),
            },
        )
        .unwrap();

        let again = get_unique_instance_object::<Settings>(&h).unwrap();
        assert_eq!(again.theme, "light");
        assert_eq!(count_objects::<Settings>(&h).unwrap(), 1);
    }

    #[test]
    fn delete_one_and_all() {
        let dir = tempfile::tempdir().unwrap();
        let h = open(&dir);
        for id in 1..=4 {
            save_object(&h, &note(id, "x")).unwrap();
        }

        assert!(delete_object::<Note>(&h, &2).unwrap());
        assert!(!delete_object::<Note>(&h, &2).unwrap());
        assert_eq!(delete_all_objects::<Note>(&h).unwrap(), 3);
        assert_eq!(count_objects::<Note>(&h).unwrap(), 0);
    }

    #[test]
    fn writes_fail_on_read_only_handle() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SqliteEngine::at_path(dir.path().join("ro.db"));
        let ro = engine.open_read_only(None).unwrap();

        let err = save_object(&ro, &note(1, "nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(!ro.is_in_transaction());
        assert_eq!(count_objects::<Note>(&ro).unwrap(), 0);
    }
}
