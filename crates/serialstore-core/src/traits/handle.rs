// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handle trait: transaction control on an open store.

use crate::error::BoxError;

/// A handle to an open store, valid only on the thread that opened it.
///
/// Implementations are usually `!Send`. Data access (queries, inserts) is
/// engine specific and not part of this trait.
pub trait StoreHandle: 'static {
    /// Brings the handle up to date with commits made through other handles.
    fn refresh(&self) -> Result<(), BoxError>;

    fn begin_transaction(&self) -> Result<(), BoxError>;

    fn commit_transaction(&self) -> Result<(), BoxError>;

    fn rollback_transaction(&self) -> Result<(), BoxError>;

    /// Whether a transaction is currently open on this handle.
    fn is_in_transaction(&self) -> bool;
}
