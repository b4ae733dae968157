// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types reported by the transaction coordinator.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Boxed low-level error as produced by a storage engine.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The closed set of failure reasons a coordinator operation can report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ErrorKind {
    /// A handle could not be opened or refreshed on some context.
    UninitializedStore,
    /// The engine rejected the transaction commit.
    SaveError,
    /// Anything not otherwise classified.
    Other,
}

/// The error carried by a failed operation.
///
/// Every variant keeps the underlying engine error as its `source` for
/// diagnostics.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Handle acquisition failed (invalid configuration, storage unavailable, disk error).
    #[error("store is not initialized: {source}")]
    UninitializedStore { source: BoxError },

    /// Transaction commit was rejected (constraint violation, disk full).
    #[error("failed to save transaction: {source}")]
    SaveError { source: BoxError },

    /// Engine-specific or user errors that fit neither category above.
    #[error("store error: {source}")]
    Other { source: BoxError },
}

impl StoreError {
    pub fn uninitialized(source: impl Into<BoxError>) -> Self {
        Self::UninitializedStore {
            source: source.into(),
        }
    }

    pub fn save(source: impl Into<BoxError>) -> Self {
        Self::SaveError {
            source: source.into(),
        }
    }

    pub fn other(source: impl Into<BoxError>) -> Self {
        Self::Other {
            source: source.into(),
        }
    }

    /// Returns the failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UninitializedStore { .. } => ErrorKind::UninitializedStore,
            Self::SaveError { .. } => ErrorKind::SaveError,
            Self::Other { .. } => ErrorKind::Other,
        }
    }
}
