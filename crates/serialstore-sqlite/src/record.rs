// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed records stored as JSON rows.

use rusqlite::types::{FromSql, ToSql};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A value persisted in the `records` table.
///
/// Each implementing type owns a `KIND` namespace and is addressed within it
/// by its primary key. The body is the serde JSON encoding of the whole value.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use serialstore_sqlite::Record;
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct User {
///     id: String,
///     name: String,
/// }
///
/// impl Record for User {
///     const KIND: &'static str = "user";
///     type Key = String;
///
///     fn key(&self) -> String {
///         self.id.clone()
///     }
///
///     fn set_key(&mut self, key: String) {
///         self.id = key;
///     }
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + Default {
    /// Namespace this type's rows live under.
    const KIND: &'static str;

    type Key: ToSql + FromSql + Clone;

    fn key(&self) -> Self::Key;

    fn set_key(&mut self, key: Self::Key);
}
