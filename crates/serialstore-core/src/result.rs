// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The value handed to every completion closure.

use crate::error::{ErrorKind, StoreError};

/// Outcome of a coordinated read or write.
///
/// On success the completion receives the work closure's value together with
/// a handle that was opened on the completion's own context and refreshed to
/// the just-committed state. The handle is borrowed for `'h`, which never
/// outlives the completion call, so it cannot be stashed or sent elsewhere.
///
/// A failure carries no handle and no value.
#[derive(Debug)]
pub enum OperationResult<'h, T, H> {
    Success { value: T, handle: &'h H },
    Failure(StoreError),
}

impl<'h, T, H> OperationResult<'h, T, H> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// Borrows the produced value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value, .. } => Some(value),
            Self::Failure(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success { value, .. } => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// The handle opened for the completion, if the operation succeeded.
    pub fn handle(&self) -> Option<&'h H> {
        match self {
            Self::Success { handle, .. } => Some(*handle),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&StoreError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(err) => Some(err),
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.error().map(StoreError::kind)
    }

    /// Converts into a plain `Result`, keeping the handle borrow on success.
    pub fn into_result(self) -> Result<(T, &'h H), StoreError> {
        match self {
            Self::Success { value, handle } => Ok((value, handle)),
            Self::Failure(err) => Err(err),
        }
    }

    /// Maps the success value, leaving failures and the handle untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<'h, U, H> {
        match self {
            Self::Success { value, handle } => OperationResult::Success {
                value: f(value),
                handle,
            },
            Self::Failure(err) => OperationResult::Failure(err),
        }
    }
}
