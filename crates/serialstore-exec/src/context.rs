// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named serial execution contexts.
//!
//! Each context owns one OS thread draining an unbounded FIFO queue. Closures
//! scheduled on the same context run strictly in submission order and never
//! overlap. Code running on a context can find it again through
//! [`ExecutionContext::current`].

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // Weak so that a context thread does not keep its own queue open.
    static CURRENT: RefCell<Option<Weak<Inner>>> = const { RefCell::new(None) };
}

/// Process-unique identity of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Errors raised by execution contexts.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The backing thread could not be started.
    #[error("failed to spawn execution context `{name}`: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },

    /// The context was shut down and accepts no more work.
    #[error("execution context `{name}` is shut down")]
    Closed { name: String },
}

struct Inner {
    id: ContextId,
    name: String,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// A cheaply clonable reference to a serial work queue bound to one thread.
///
/// The thread stops once the context is shut down, or once every clone has
/// been dropped, after draining whatever was already queued.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<Inner>,
}

impl ExecutionContext {
    /// Starts a new context on a dedicated thread named `name`.
    pub fn spawn(name: impl Into<String>) -> Result<Self, ContextError> {
        let name = name.into();
        let (sender, queue) = mpsc::unbounded_channel::<Job>();
        let inner = Arc::new(Inner {
            id: ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.clone(),
            sender: Mutex::new(Some(sender)),
            thread: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(weak, queue))
            .map_err(|source| ContextError::Spawn {
                name: name.clone(),
                source,
            })?;
        *inner.thread.lock() = Some(thread);

        debug!(context = %name, id = %inner.id, "execution context started");
        Ok(Self { inner })
    }

    /// Returns the context the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called from a thread that is not driving an execution
    /// context. Every coordinated operation must be issued from a context (or
    /// name an explicit completion target), so this is a programming error.
    pub fn current() -> Self {
        Self::try_current().unwrap_or_else(|| {
            panic!(
                "ExecutionContext::current() called on thread `{}` which runs no execution context",
                thread::current().name().unwrap_or("<unnamed>")
            )
        })
    }

    /// Like [`current`](Self::current), but returns `None` off-context.
    pub fn try_current() -> Option<Self> {
        CURRENT.with(|current| {
            current
                .borrow()
                .as_ref()
                .and_then(Weak::upgrade)
                .map(|inner| Self { inner })
        })
    }

    /// Enqueues `job` to run later on this context.
    ///
    /// Never blocks and never runs `job` inline, even when called from this
    /// same context.
    pub fn schedule<F>(&self, job: F) -> Result<(), ContextError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_with((), move |()| job())
            .map_err(|(err, ())| err)
    }

    /// Enqueues `job(state)`. A closed context hands `state` back untouched,
    /// so whatever it owns can still be used to report the rejection.
    pub fn schedule_with<S, F>(&self, state: S, job: F) -> Result<(), (ContextError, S)>
    where
        S: Send + 'static,
        F: FnOnce(S) + Send + 'static,
    {
        let sender = self.inner.sender.lock();
        match sender.as_ref() {
            Some(sender) if !sender.is_closed() => {
                // The queue outlives every sender, so this send cannot fail
                // while the lock is held.
                let _ = sender.send(Box::new(move || job(state)));
                Ok(())
            }
            _ => Err((self.closed(), state)),
        }
    }

    /// Stops accepting work, lets queued closures finish, and joins the thread.
    ///
    /// When called from the context itself the thread is left to wind down on
    /// its own. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        let Some(sender) = self.inner.sender.lock().take() else {
            return;
        };
        drop(sender);

        if self.is_current() {
            debug!(context = %self.inner.name, "shutdown requested from inside context, not joining");
            return;
        }

        let thread = self.inner.thread.lock().take();
        if let Some(thread) = thread
            && thread.join().is_err()
        {
            warn!(context = %self.inner.name, "execution context thread terminated abnormally");
        }
        debug!(context = %self.inner.name, id = %self.inner.id, "execution context shut down");
    }

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the calling code is running on this context.
    pub fn is_current(&self) -> bool {
        CURRENT.with(|current| {
            current
                .borrow()
                .as_ref()
                .is_some_and(|weak| Weak::as_ptr(weak) == Arc::as_ptr(&self.inner))
        })
    }

    pub fn is_closed(&self) -> bool {
        self.inner.sender.lock().is_none()
    }

    fn closed(&self) -> ContextError {
        ContextError::Closed {
            name: self.inner.name.clone(),
        }
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ExecutionContext {}

impl std::hash::Hash for ExecutionContext {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

fn run(context: Weak<Inner>, mut queue: mpsc::UnboundedReceiver<Job>) {
    let name = thread::current().name().unwrap_or("<unnamed>").to_string();
    CURRENT.with(|current| *current.borrow_mut() = Some(context));

    while let Some(job) = queue.blocking_recv() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            error!(
                context = %name,
                panic = %panic_message(payload.as_ref()),
                "scheduled closure panicked"
            );
        }
    }

    CURRENT.with(|current| current.borrow_mut().take());
    debug!(context = %name, "execution context drained");
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
