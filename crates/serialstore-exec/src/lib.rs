// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serial execution contexts for SerialStore.
//!
//! An [`ExecutionContext`] is a FIFO work queue bound to one dedicated
//! thread. The transaction coordinator runs all store access on a private
//! context and sends completions back to whichever context issued the call.

pub mod context;

pub use context::{ContextError, ContextId, ExecutionContext, panic_message};
