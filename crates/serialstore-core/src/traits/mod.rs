// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the coordinator needs from a storage engine.
//!
//! The engine itself (file format, queries, change notification) lives
//! behind these two traits; the coordinator only opens handles and drives
//! transaction boundaries.

pub mod engine;
pub mod handle;

pub use engine::StoreEngine;
pub use handle::StoreHandle;
