// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transaction coordinator for thread-confined store handles.
//!
//! [`TransactionCoordinator`] serializes every read and write on one store
//! onto a private worker [`ExecutionContext`](serialstore_exec::ExecutionContext),
//! opens a fresh handle for each operation on the context that uses it,
//! wraps writes in implicit transactions (joining one that is already open),
//! and delivers an [`OperationResult`](serialstore_core::OperationResult)
//! back to the calling context.
//!
//! # Usage
//!
//! ```no_run
//! use serialstore_coordinator::TransactionCoordinator;
//! # fn demo<E: serialstore_core::StoreEngine>(engine: E) {
//! let coordinator = TransactionCoordinator::new(engine).expect("worker thread");
//! coordinator.write_detached(|_handle| {
//!     // mutate the store through the handle
//! });
//! # }
//! ```

pub mod bridge;
pub mod coordinator;
pub mod dispatch;
pub mod transaction;

pub use bridge::OperationFuture;
pub use coordinator::{DEFAULT_WORKER_NAME, TransactionCoordinator};
pub use dispatch::Dispatch;
pub use transaction::{run_in_transaction, try_write_nested, write_nested};
