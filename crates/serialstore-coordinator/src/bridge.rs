// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Awaitable operations for async callers.
//!
//! An async task is not an execution context and cannot hold a
//! thread-confined handle across an `.await`, so these variants skip the
//! completion-side handle and resolve to the bare value. The operation itself
//! still runs on the coordinator's worker, in the same order as every other
//! call, and is queued as soon as the method returns (not on first poll).

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use serialstore_core::{BoxError, StoreEngine, StoreError};

use crate::coordinator::TransactionCoordinator;

/// Resolves to the outcome of an operation queued on a coordinator.
#[must_use = "the operation runs regardless, but its outcome is lost unless awaited"]
#[derive(Debug)]
pub struct OperationFuture<T> {
    outcome: oneshot::Receiver<Result<T, StoreError>>,
}

impl<T> Future for OperationFuture<T> {
    type Output = Result<T, StoreError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.outcome).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(StoreError::other(
                    "coordinator worker stopped before the operation completed",
                ))
            })
        })
    }
}

impl<E: StoreEngine> TransactionCoordinator<E> {
    /// Queues a read and returns a future for its value.
    pub fn read_async<T, W>(&self, work: W) -> OperationFuture<T>
    where
        T: Send + 'static,
        W: FnOnce(&E::Handle) -> T + Send + 'static,
    {
        self.try_read_async(move |h| Ok::<T, Infallible>(work(h)))
    }

    pub fn try_read_async<T, Er, W>(&self, work: W) -> OperationFuture<T>
    where
        T: Send + 'static,
        Er: Into<BoxError>,
        W: FnOnce(&E::Handle) -> Result<T, Er> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.submit(
            None,
            move |shared| shared.read(work),
            move |_, outcome| {
                let _ = tx.send(outcome);
            },
        );
        OperationFuture { outcome: rx }
    }

    /// Queues a write and returns a future resolving after it committed.
    pub fn write_async<T, W>(&self, work: W) -> OperationFuture<T>
    where
        T: Send + 'static,
        W: FnOnce(&E::Handle) -> T + Send + 'static,
    {
        self.try_write_async(move |h| Ok::<T, Infallible>(work(h)))
    }

    pub fn try_write_async<T, Er, W>(&self, work: W) -> OperationFuture<T>
    where
        T: Send + 'static,
        Er: Into<BoxError>,
        W: FnOnce(&E::Handle) -> Result<T, Er> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.submit(
            None,
            move |shared| shared.write(work),
            move |_, outcome| {
                let _ = tx.send(outcome);
            },
        );
        OperationFuture { outcome: rx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialstore_core::ErrorKind;
    use serialstore_test_utils::{EventKind, MockEngine};

    #[tokio::test]
    async fn write_async_resolves_after_commit() {
        let engine = MockEngine::new();
        let coordinator = TransactionCoordinator::new(engine.clone()).unwrap();

        let written = coordinator
            .try_write_async(|h| {
                h.put("k", "v")?;
                Ok::<_, BoxError>(h.len())
            })
            .await
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(engine.count(EventKind::Committed), 1);
        assert_eq!(engine.committed().get("k").map(String::as_str), Some("v"));
    }

    #[tokio::test]
    async fn read_async_sees_committed_state() {
        let engine = MockEngine::new();
        engine.seed("seeded", "1");
        let coordinator = TransactionCoordinator::new(engine.clone()).unwrap();

        let value = coordinator.read_async(|h| h.get("seeded")).await.unwrap();
        assert_eq!(value.as_deref(), Some("1"));
        assert_eq!(engine.count(EventKind::Began), 0);
    }

    #[tokio::test]
    async fn async_failure_carries_kind() {
        let engine = MockEngine::new();
        engine.fail_commits(true);
        let coordinator = TransactionCoordinator::new(engine).unwrap();

        let err = coordinator.write_async(|_| 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SaveError);
    }

    #[tokio::test]
    async fn queued_in_call_order_not_poll_order() {
        let engine = MockEngine::new();
        let coordinator = TransactionCoordinator::new(engine.clone()).unwrap();

        let first = coordinator.try_write_async(|h| h.put("order", "first"));
        let second = coordinator.try_write_async(|h| h.put("order", "second"));

        // Await in reverse; the worker already ran them in call order.
        second.await.unwrap();
        first.await.unwrap();
        assert_eq!(
            engine.committed().get("order").map(String::as_str),
            Some("second")
        );
    }
}
