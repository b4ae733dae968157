// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-operation steps run on a handle: acquisition, the implicit
//! transaction window, and read execution.
//!
//! Everything here runs synchronously on whichever context owns the handle.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use serialstore_core::{BoxError, OperationResult, StoreEngine, StoreError, StoreHandle};
use serialstore_exec::panic_message;

/// How a handle is going to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    ReadOnly,
    ReadWrite,
}

/// Opens and refreshes a handle on the calling thread.
pub(crate) fn acquire<E: StoreEngine>(
    engine: &E,
    configuration: Option<&E::Configuration>,
    access: Access,
) -> Result<E::Handle, StoreError> {
    let handle = match access {
        Access::ReadOnly => engine.open_read_only(configuration),
        Access::ReadWrite => engine.open(configuration),
    }
    .map_err(StoreError::uninitialized)?;
    handle.refresh().map_err(StoreError::uninitialized)?;
    debug!(?access, "handle acquired");
    Ok(handle)
}

/// Runs `work` inside a transaction on `handle`.
///
/// When no transaction is open, one is begun, and committed once `work`
/// returns. When one is already open, `work` joins it and the owner of that
/// transaction is responsible for committing.
///
/// If `work` fails or panics, a transaction begun here is rolled back and the
/// failure is returned as [`StoreError::Other`]. A rejected commit yields
/// [`StoreError::SaveError`] and the value is dropped.
pub fn run_in_transaction<H, T, W>(handle: &H, work: W) -> Result<T, StoreError>
where
    H: StoreHandle,
    W: FnOnce(&H) -> Result<T, StoreError>,
{
    let owns_transaction = !handle.is_in_transaction();
    if owns_transaction {
        handle.begin_transaction().map_err(StoreError::other)?;
        debug!("transaction begun");
    } else {
        debug!("joining transaction already open on handle");
    }

    let value = match guarded(|| work(handle)) {
        Ok(value) => value,
        Err(err) => {
            if owns_transaction {
                rollback(handle);
            }
            return Err(err);
        }
    };

    if !owns_transaction {
        return Ok(value);
    }

    match handle.commit_transaction() {
        Ok(()) => {
            debug!("transaction committed");
            Ok(value)
        }
        Err(source) => {
            warn!(error = %source, "transaction commit failed");
            if handle.is_in_transaction() {
                rollback(handle);
            }
            Err(StoreError::save(source))
        }
    }
}

/// Runs read-only `work` against `handle`, converting a panic into an error.
pub(crate) fn run_read<H, T, W>(handle: &H, work: W) -> Result<T, StoreError>
where
    H: StoreHandle,
    W: FnOnce(&H) -> Result<T, StoreError>,
{
    guarded(|| work(handle))
}

/// Writes through a handle that may already be inside a transaction.
///
/// Meant to be called from within another write's work closure: the outer
/// transaction is joined rather than nested, no begin or commit happens, and
/// the success carries the outer handle. Called on a handle with no open
/// transaction it behaves like a complete write on that handle.
pub fn write_nested<'h, H, T, W>(handle: &'h H, work: W) -> OperationResult<'h, T, H>
where
    H: StoreHandle,
    W: FnOnce(&H) -> T,
{
    try_write_nested(handle, |h| Ok::<T, std::convert::Infallible>(work(h)))
}

/// Fallible variant of [`write_nested`].
pub fn try_write_nested<'h, H, T, Er, W>(handle: &'h H, work: W) -> OperationResult<'h, T, H>
where
    H: StoreHandle,
    Er: Into<BoxError>,
    W: FnOnce(&H) -> Result<T, Er>,
{
    match run_in_transaction(handle, |h| work(h).map_err(StoreError::other)) {
        Ok(value) => OperationResult::Success { value, handle },
        Err(err) => OperationResult::Failure(err),
    }
}

fn guarded<T>(work: impl FnOnce() -> Result<T, StoreError>) -> Result<T, StoreError> {
    panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        Err(StoreError::other(format!(
            "work closure panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}

fn rollback<H: StoreHandle>(handle: &H) {
    match handle.rollback_transaction() {
        Ok(()) => debug!("transaction rolled back"),
        Err(err) => warn!(error = %err, "transaction rollback failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialstore_core::ErrorKind;
    use serialstore_test_utils::{EventKind, MockEngine};
    use tracing_test::traced_test;

    #[test]
    fn owned_transaction_is_begun_and_committed() {
        let engine = MockEngine::new();
        let handle = engine.open(None).unwrap();

        let value = run_in_transaction(&handle, |h| {
            h.put("a", "1").map_err(StoreError::other)?;
            Ok(10)
        })
        .unwrap();

        assert_eq!(value, 10);
        assert_eq!(engine.count(EventKind::Began), 1);
        assert_eq!(engine.count(EventKind::Committed), 1);
        assert_eq!(engine.committed().get("a").map(String::as_str), Some("1"));
    }

    #[test]
    #[traced_test]
    fn commit_failure_is_save_error_and_rolls_back() {
        let engine = MockEngine::new();
        engine.fail_commits(true);
        let handle = engine.open(None).unwrap();

        let err = run_in_transaction(&handle, |h| {
            h.put("a", "1").map_err(StoreError::other)?;
            Ok("value that must be dropped")
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SaveError);
        assert_eq!(engine.count(EventKind::RolledBack), 1);
        assert!(!handle.is_in_transaction());
        assert!(engine.committed().is_empty());
        assert!(logs_contain("transaction commit failed"));
    }

    #[test]
    fn closure_error_rolls_back_owned_transaction() {
        let engine = MockEngine::new();
        let handle = engine.open(None).unwrap();

        let err = run_in_transaction(&handle, |h| -> Result<(), StoreError> {
            h.put("a", "1").map_err(StoreError::other)?;
            Err(StoreError::other("validation failed"))
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(engine.count(EventKind::Committed), 0);
        assert_eq!(engine.count(EventKind::RolledBack), 1);
        assert!(engine.committed().is_empty());
    }

    #[test]
    fn panicking_closure_rolls_back_and_reports_message() {
        let engine = MockEngine::new();
        let handle = engine.open(None).unwrap();

        let err = run_in_transaction(&handle, |_| -> Result<(), StoreError> {
            panic!("closure exploded")
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(err.to_string().contains("closure exploded"));
        assert_eq!(engine.count(EventKind::RolledBack), 1);
    }

    #[test]
    fn nested_write_joins_outer_transaction() {
        let engine = MockEngine::new();
        let handle = engine.open(None).unwrap();

        let outer = run_in_transaction(&handle, |h| {
            let inner = try_write_nested(h, |h| {
                h.put("inner", "x")?;
                Ok::<_, BoxError>(h.id())
            });
            assert!(inner.is_success());
            let carried = inner.handle().map(|inner_handle| inner_handle.id());
            assert_eq!(carried, Some(h.id()), "nested success carries the outer handle");
            Ok(inner.into_value())
        })
        .unwrap();

        assert!(outer.is_some());
        assert_eq!(engine.count(EventKind::Began), 1);
        assert_eq!(engine.count(EventKind::Committed), 1);
        assert_eq!(engine.committed().get("inner").map(String::as_str), Some("x"));
    }

    #[test]
    fn nested_write_on_idle_handle_owns_its_transaction() {
        let engine = MockEngine::new();
        let handle = engine.open(None).unwrap();

        let result = write_nested(&handle, |h| h.put("solo", "1").is_ok());

        assert_eq!(result.value(), Some(&true));
        assert_eq!(engine.count(EventKind::Began), 1);
        assert_eq!(engine.count(EventKind::Committed), 1);
    }

    #[test]
    fn nested_failure_leaves_rollback_to_owner() {
        let engine = MockEngine::new();
        let handle = engine.open(None).unwrap();
        handle.begin_transaction().unwrap();

        let result = try_write_nested(&handle, |_| Err::<(), _>("bad input"));

        assert_eq!(result.kind(), Some(ErrorKind::Other));
        assert!(handle.is_in_transaction(), "outer transaction stays open");
        assert_eq!(engine.count(EventKind::RolledBack), 0);
    }

    #[test]
    fn acquire_maps_open_failure_to_uninitialized() {
        let engine = MockEngine::new();
        engine.fail_opens(true);
        let err = acquire(&engine, None, Access::ReadWrite).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UninitializedStore);
    }

    #[test]
    fn acquire_refreshes_handle() {
        let engine = MockEngine::new();
        let handle = acquire(&engine, None, Access::ReadOnly).unwrap();
        assert!(handle.is_read_only());
        assert_eq!(engine.count(EventKind::Refreshed), 1);
    }
}
