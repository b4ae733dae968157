// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for driving coordinated operations from tests.
//!
//! Coordinator calls must be issued from an execution context, and their
//! completions arrive asynchronously. These helpers spawn caller contexts and
//! wait on completion channels with a timeout so a lost completion fails the
//! test instead of hanging it.

use std::time::Duration;

use serialstore_exec::ExecutionContext;
use tokio::sync::oneshot;

/// How long a test waits for a completion before failing.
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(5);

/// Spawns a named caller context for a test.
pub fn caller_context(name: &str) -> ExecutionContext {
    ExecutionContext::spawn(name).expect("failed to spawn test context")
}

/// Runs `f` on `ctx` and returns a receiver for its output.
pub fn run_on<R, F>(ctx: &ExecutionContext, f: F) -> oneshot::Receiver<R>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    ctx.schedule(move || {
        let _ = tx.send(f());
    })
    .expect("test context is closed");
    rx
}

/// Issues a coordinated call from `ctx` and awaits what its completion sends.
///
/// `issue` runs on `ctx` and receives the sender the completion should
/// report through.
pub async fn issue_from<R, F>(ctx: &ExecutionContext, issue: F) -> R
where
    R: Send + 'static,
    F: FnOnce(oneshot::Sender<R>) + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let _ = run_on(ctx, move || issue(tx));
    completion(rx).await
}

/// Awaits a completion, panicking after [`COMPLETION_TIMEOUT`].
pub async fn completion<T>(rx: oneshot::Receiver<T>) -> T {
    tokio::time::timeout(COMPLETION_TIMEOUT, rx)
        .await
        .expect("completion did not arrive in time")
        .expect("completion sender was dropped")
}

/// Blocking variant of [`completion`] for synchronous tests.
pub fn blocking_completion<T>(rx: oneshot::Receiver<T>) -> T {
    rx.blocking_recv().expect("completion sender was dropped")
}

/// Waits until every closure already queued on `ctx` has run.
pub async fn drain(ctx: &ExecutionContext) {
    completion(run_on(ctx, || ())).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_on_returns_value_from_context() {
        let ctx = caller_context("harness-run-on");
        let name = completion(run_on(&ctx, || ExecutionContext::current().name().to_string())).await;
        assert_eq!(name, "harness-run-on");
        ctx.shutdown();
    }

    #[test]
    fn blocking_completion_waits_for_value() {
        let ctx = caller_context("harness-blocking");
        assert_eq!(blocking_completion(run_on(&ctx, || 5 * 5)), 25);
        ctx.shutdown();
    }
}
