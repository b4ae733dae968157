// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transaction coordinator.
//!
//! All store access for one logical store is funnelled through a private
//! worker context with a single thread. An operation is a pair of closures:
//! `work` runs on the worker against a freshly opened handle (inside an
//! implicit transaction for writes), and `completion` runs on the calling
//! context against a second handle opened there, receiving an
//! [`OperationResult`].
//!
//! Because the worker runs one closure at a time, reads and writes issued to
//! the same coordinator are totally ordered and no two of its transactions
//! ever overlap. Calls routed elsewhere with [`Dispatch::run_on`] give that up.

use std::convert::Infallible;
use std::sync::Arc;

use tracing::{debug, error, warn};

use serialstore_config::model::CoordinatorConfig;
use serialstore_core::{BoxError, OperationResult, StoreEngine, StoreError};
use serialstore_exec::{ContextError, ExecutionContext};

use crate::dispatch::Dispatch;
use crate::transaction::{self, Access};

/// Name of the worker thread when none is configured.
pub const DEFAULT_WORKER_NAME: &str = "serialstore-worker";

pub(crate) struct Shared<E: StoreEngine> {
    engine: E,
    configuration: Option<E::Configuration>,
}

impl<E: StoreEngine> Shared<E> {
    fn acquire(&self, access: Access) -> Result<E::Handle, StoreError> {
        transaction::acquire(&self.engine, self.configuration.as_ref(), access)
    }

    pub(crate) fn read<T, Er, W>(&self, work: W) -> Result<T, StoreError>
    where
        Er: Into<BoxError>,
        W: FnOnce(&E::Handle) -> Result<T, Er>,
    {
        let handle = self.acquire(Access::ReadOnly)?;
        transaction::run_read(&handle, |h| work(h).map_err(StoreError::other))
    }

    pub(crate) fn write<T, Er, W>(&self, work: W) -> Result<T, StoreError>
    where
        Er: Into<BoxError>,
        W: FnOnce(&E::Handle) -> Result<T, Er>,
    {
        let handle = self.acquire(Access::ReadWrite)?;
        transaction::run_in_transaction(&handle, |h| work(h).map_err(StoreError::other))
    }
}

/// Serializes reads and writes on one store onto a private worker context.
///
/// The worker is started by the constructor and shut down when the
/// coordinator is dropped; already-queued operations and their completions
/// still run. Handles are opened per operation and per context and never
/// outlive the closure they were opened for.
pub struct TransactionCoordinator<E: StoreEngine> {
    shared: Arc<Shared<E>>,
    worker: ExecutionContext,
}

impl<E: StoreEngine> TransactionCoordinator<E> {
    /// Creates a coordinator using the engine's default handle configuration.
    pub fn new(engine: E) -> Result<Self, ContextError> {
        Self::build(engine, None, DEFAULT_WORKER_NAME)
    }

    /// Creates a coordinator that opens every handle with `configuration`.
    pub fn with_configuration(
        engine: E,
        configuration: E::Configuration,
    ) -> Result<Self, ContextError> {
        Self::build(engine, Some(configuration), DEFAULT_WORKER_NAME)
    }

    /// Creates a coordinator from loaded settings.
    pub fn from_config(
        engine: E,
        configuration: Option<E::Configuration>,
        config: &CoordinatorConfig,
    ) -> Result<Self, ContextError> {
        Self::build(engine, configuration, &config.worker_name)
    }

    fn build(
        engine: E,
        configuration: Option<E::Configuration>,
        worker_name: &str,
    ) -> Result<Self, ContextError> {
        let worker = ExecutionContext::spawn(worker_name)?;
        debug!(worker = %worker.name(), "transaction coordinator started");
        Ok(Self {
            shared: Arc::new(Shared {
                engine,
                configuration,
            }),
            worker,
        })
    }

    /// The private context all serialized operations run on.
    pub fn worker(&self) -> &ExecutionContext {
        &self.worker
    }

    pub fn engine(&self) -> &E {
        &self.shared.engine
    }

    pub fn configuration(&self) -> Option<&E::Configuration> {
        self.shared.configuration.as_ref()
    }

    // --- Read operations ---

    /// Runs `work` on the worker and delivers its value to the calling context.
    ///
    /// Both `work` and `completion` receive read-only handles.
    ///
    /// # Panics
    ///
    /// Panics if the caller is not running on an [`ExecutionContext`]; use
    /// [`read_on`](Self::read_on) to name a completion target explicitly.
    pub fn read<T, W, C>(&self, work: W, completion: C)
    where
        T: Send + 'static,
        W: FnOnce(&E::Handle) -> T + Send + 'static,
        C: for<'h> FnOnce(OperationResult<'h, T, E::Handle>) + Send + 'static,
    {
        self.read_with(Dispatch::new(), work, completion);
    }

    /// Like [`read`](Self::read), delivering the completion on `target`.
    pub fn read_on<T, W, C>(&self, target: &ExecutionContext, work: W, completion: C)
    where
        T: Send + 'static,
        W: FnOnce(&E::Handle) -> T + Send + 'static,
        C: for<'h> FnOnce(OperationResult<'h, T, E::Handle>) + Send + 'static,
    {
        self.read_with(Dispatch::new().complete_on(target.clone()), work, completion);
    }

    pub fn read_with<T, W, C>(&self, dispatch: Dispatch, work: W, completion: C)
    where
        T: Send + 'static,
        W: FnOnce(&E::Handle) -> T + Send + 'static,
        C: for<'h> FnOnce(OperationResult<'h, T, E::Handle>) + Send + 'static,
    {
        self.try_read_with(dispatch, move |h| Ok::<T, Infallible>(work(h)), completion);
    }

    /// Read whose work can fail; an `Err` reaches the completion as
    /// [`StoreError::Other`].
    pub fn try_read<T, Er, W, C>(&self, work: W, completion: C)
    where
        T: Send + 'static,
        Er: Into<BoxError>,
        W: FnOnce(&E::Handle) -> Result<T, Er> + Send + 'static,
        C: for<'h> FnOnce(OperationResult<'h, T, E::Handle>) + Send + 'static,
    {
        self.try_read_with(Dispatch::new(), work, completion);
    }

    pub fn try_read_with<T, Er, W, C>(&self, dispatch: Dispatch, work: W, completion: C)
    where
        T: Send + 'static,
        Er: Into<BoxError>,
        W: FnOnce(&E::Handle) -> Result<T, Er> + Send + 'static,
        C: for<'h> FnOnce(OperationResult<'h, T, E::Handle>) + Send + 'static,
    {
        let caller = dispatch.caller();
        self.submit(
            dispatch.worker_override(),
            move |shared| shared.read(work),
            move |shared, outcome| {
                complete_on(caller, shared, Access::ReadOnly, outcome, completion)
            },
        );
    }

    /// Read whose work returns nothing; the completion gets `()` as value.
    ///
    /// Goes through the generic path with `T = ()`.
    pub fn read_unit<W, C>(&self, work: W, completion: C)
    where
        W: FnOnce(&E::Handle) + Send + 'static,
        C: for<'h> FnOnce(OperationResult<'h, (), E::Handle>) + Send + 'static,
    {
        self.read_with(Dispatch::new(), work, completion);
    }

    // --- Write operations ---

    /// Runs `work` on the worker inside a transaction and delivers its value
    /// to the calling context once the transaction has committed. The
    /// completion's handle is writable.
    ///
    /// If the worker's handle is already inside a transaction, `work` joins it
    /// and no begin or commit happens. A failed commit is reported as
    /// [`StoreError::SaveError`] and the value is dropped.
    ///
    /// # Panics
    ///
    /// Panics if the caller is not running on an [`ExecutionContext`]; use
    /// [`write_on`](Self::write_on) to name a completion target explicitly.
    pub fn write<T, W, C>(&self, work: W, completion: C)
    where
        T: Send + 'static,
        W: FnOnce(&E::Handle) -> T + Send + 'static,
        C: for<'h> FnOnce(OperationResult<'h, T, E::Handle>) + Send + 'static,
    {
        self.write_with(Dispatch::new(), work, completion);
    }

    /// Like [`write`](Self::write), delivering the completion on `target`.
    pub fn write_on<T, W, C>(&self, target: &ExecutionContext, work: W, completion: C)
    where
        T: Send + 'static,
        W: FnOnce(&E::Handle) -> T + Send + 'static,
        C: for<'h> FnOnce(OperationResult<'h, T, E::Handle>) + Send + 'static,
    {
        self.write_with(Dispatch::new().complete_on(target.clone()), work, completion);
    }

    pub fn write_with<T, W, C>(&self, dispatch: Dispatch, work: W, completion: C)
    where
        T: Send + 'static,
        W: FnOnce(&E::Handle) -> T + Send + 'static,
        C: for<'h> FnOnce(OperationResult<'h, T, E::Handle>) + Send + 'static,
    {
        self.try_write_with(dispatch, move |h| Ok::<T, Infallible>(work(h)), completion);
    }

    /// Write whose work can fail. An `Err` (or a panic) rolls back the
    /// transaction this call began and reaches the completion as
    /// [`StoreError::Other`].
    pub fn try_write<T, Er, W, C>(&self, work: W, completion: C)
    where
        T: Send + 'static,
        Er: Into<BoxError>,
        W: FnOnce(&E::Handle) -> Result<T, Er> + Send + 'static,
        C: for<'h> FnOnce(OperationResult<'h, T, E::Handle>) + Send + 'static,
    {
        self.try_write_with(Dispatch::new(), work, completion);
    }

    pub fn try_write_with<T, Er, W, C>(&self, dispatch: Dispatch, work: W, completion: C)
    where
        T: Send + 'static,
        Er: Into<BoxError>,
        W: FnOnce(&E::Handle) -> Result<T, Er> + Send + 'static,
        C: for<'h> FnOnce(OperationResult<'h, T, E::Handle>) + Send + 'static,
    {
        let caller = dispatch.caller();
        self.submit(
            dispatch.worker_override(),
            move |shared| shared.write(work),
            move |shared, outcome| {
                complete_on(caller, shared, Access::ReadWrite, outcome, completion)
            },
        );
    }

    /// Write whose work returns nothing; the completion gets `()` as value.
    ///
    /// Goes through the generic path with `T = ()`.
    pub fn write_unit<W, C>(&self, work: W, completion: C)
    where
        W: FnOnce(&E::Handle) + Send + 'static,
        C: for<'h> FnOnce(OperationResult<'h, (), E::Handle>) + Send + 'static,
    {
        self.write_with(Dispatch::new(), work, completion);
    }

    /// Fire-and-forget write. Failures are logged and otherwise dropped.
    ///
    /// Needs no caller context, so it can be issued from any thread.
    pub fn write_detached<T, W>(&self, work: W)
    where
        T: 'static,
        W: FnOnce(&E::Handle) -> T + Send + 'static,
    {
        self.submit(
            None,
            move |shared| shared.write(move |h| Ok::<T, Infallible>(work(h))),
            |_, outcome| {
                if let Err(err) = outcome {
                    warn!(kind = %err.kind(), error = %err, "detached write failed");
                }
            },
        );
    }

    /// Queues `op` on the worker (or the override) and hands its outcome to
    /// `deliver` on that same context.
    ///
    /// If that context is closed, `op` never runs and `deliver` gets the
    /// rejection as [`StoreError::Other`] on the submitting thread.
    pub(crate) fn submit<T, Op, D>(&self, worker: Option<&ExecutionContext>, op: Op, deliver: D)
    where
        Op: FnOnce(&Shared<E>) -> Result<T, StoreError> + Send + 'static,
        D: FnOnce(&Arc<Shared<E>>, Result<T, StoreError>) + Send + 'static,
    {
        let worker = worker.unwrap_or(&self.worker);
        let shared = Arc::clone(&self.shared);
        let scheduled = worker.schedule_with((op, deliver), move |(op, deliver)| {
            let outcome = op(&shared);
            deliver(&shared, outcome);
        });
        if let Err((err, (_, deliver))) = scheduled {
            error!(
                context = %worker.name(),
                error = %err,
                "operation rejected, worker context is closed"
            );
            deliver(&self.shared, Err(StoreError::other(err)));
        }
    }
}

impl<E: StoreEngine> Drop for TransactionCoordinator<E> {
    fn drop(&mut self) {
        self.worker.shutdown();
    }
}

/// Schedules `completion` on `caller` with a handle opened there with
/// `access`.
///
/// A failed outcome is delivered as is, without opening a handle. A
/// successful one is downgraded to a failure if the caller-side handle
/// cannot be acquired.
fn complete_on<E, T, C>(
    caller: ExecutionContext,
    shared: &Arc<Shared<E>>,
    access: Access,
    outcome: Result<T, StoreError>,
    completion: C,
) where
    E: StoreEngine,
    T: Send + 'static,
    C: for<'h> FnOnce(OperationResult<'h, T, E::Handle>) + Send + 'static,
{
    let shared = Arc::clone(shared);
    let scheduled = caller.schedule(move || {
        let acquired = outcome.and_then(|value| {
            shared.acquire(access).map(|handle| (value, handle))
        });
        match acquired {
            Ok((value, handle)) => completion(OperationResult::Success {
                value,
                handle: &handle,
            }),
            Err(err) => completion(OperationResult::Failure(err)),
        }
    });
    if let Err(err) = scheduled {
        warn!(
            context = %caller.name(),
            error = %err,
            "completion dropped, caller context is closed"
        );
    }
}
