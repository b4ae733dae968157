// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-call routing options.

use serialstore_exec::ExecutionContext;

/// Where an operation runs and where its completion is delivered.
///
/// The default runs the operation on the coordinator's worker and delivers the
/// completion to [`ExecutionContext::current`].
///
/// [`run_on`](Self::run_on) replaces the worker for a single call. Such calls
/// are no longer ordered against the coordinator's other operations and may
/// run transactions concurrently with them. It exists for callers that manage
/// their own serialization and must be chosen explicitly at the call site.
#[derive(Debug, Clone, Default)]
pub struct Dispatch {
    complete_on: Option<ExecutionContext>,
    run_on: Option<ExecutionContext>,
}

impl Dispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver the completion on `context` instead of the calling context.
    pub fn complete_on(mut self, context: ExecutionContext) -> Self {
        self.complete_on = Some(context);
        self
    }

    /// Run the operation on `context` instead of the coordinator's worker.
    ///
    /// Opts this call out of the coordinator's total ordering.
    pub fn run_on(mut self, context: ExecutionContext) -> Self {
        self.run_on = Some(context);
        self
    }

    /// False when the call bypasses the coordinator's worker.
    pub fn is_serialized(&self) -> bool {
        self.run_on.is_none()
    }

    /// Resolves the completion target, falling back to the calling context.
    ///
    /// # Panics
    ///
    /// Panics when no target was given and the caller is not on a context.
    pub(crate) fn caller(&self) -> ExecutionContext {
        self.complete_on
            .clone()
            .unwrap_or_else(ExecutionContext::current)
    }

    pub(crate) fn worker_override(&self) -> Option<&ExecutionContext> {
        self.run_on.as_ref()
    }
}
