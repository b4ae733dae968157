// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite storage engine for SerialStore.
//!
//! [`SqliteEngine`] opens one connection per handle, applying the configured
//! busy timeout and WAL mode and running embedded migrations on first use of
//! a database. Typed [`Record`]s are stored as JSON rows and accessed through
//! the helpers in [`queries`].

pub mod engine;
pub mod migrations;
pub mod queries;
pub mod record;
pub mod sort;

pub use engine::{SqliteEngine, SqliteHandle};
pub use queries::{
    Predicate, count_objects, delete_all_objects, delete_object, get_all_objects, get_object,
    get_objects, get_or_create_object, get_unique_instance_object, primary_keys, save_object,
};
pub use record::Record;
pub use sort::{SortDescriptor, combine};
