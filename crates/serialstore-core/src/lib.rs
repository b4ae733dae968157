// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for SerialStore.
//!
//! This crate provides the error taxonomy, the [`OperationResult`] handed to
//! completion closures, and the [`StoreEngine`]/[`StoreHandle`] traits a
//! storage engine implements to be driven by the transaction coordinator.

pub mod error;
pub mod result;
pub mod traits;

// Re-export key items at crate root for ergonomic imports.
pub use error::{BoxError, ErrorKind, StoreError};
pub use result::OperationResult;
pub use traits::{StoreEngine, StoreHandle};
