// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instrumented in-memory storage engine for deterministic testing.
//!
//! `MockEngine` implements `StoreEngine` over a shared key/value map and
//! records every handle open, refresh, begin, commit and rollback with a
//! sequence number, timestamp and thread name. Failures can be injected for
//! opens and commits, and handles can be made to start inside an already-open
//! transaction to exercise the nested path.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;

use serialstore_core::{BoxError, StoreEngine, StoreHandle};

/// What happened to a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Opened { read_only: bool },
    Refreshed,
    Began,
    Committed,
    CommitFailed,
    RolledBack,
}

/// One recorded engine call.
#[derive(Debug, Clone)]
pub struct EngineEvent {
    /// Global order in which the engine observed the call.
    pub seq: u64,
    pub at: Instant,
    pub thread: String,
    pub handle: u64,
    pub kind: EventKind,
}

/// Handle-level configuration: a label echoed into the open log.
#[derive(Debug, Clone, Default)]
pub struct MockConfiguration {
    pub label: String,
}

#[derive(Default)]
struct EngineState {
    committed: Mutex<BTreeMap<String, String>>,
    events: Mutex<Vec<EngineEvent>>,
    labels: Mutex<Vec<Option<String>>>,
    next_seq: AtomicU64,
    next_handle: AtomicU64,
    failing_open_threads: Mutex<Vec<String>>,
    fail_all_opens: AtomicBool,
    fail_commits: AtomicBool,
    outer_transaction: AtomicBool,
    active_transactions: AtomicUsize,
    max_active_transactions: AtomicUsize,
}

impl EngineState {
    fn record(&self, handle: u64, kind: EventKind) {
        // Sequence assignment and push happen under one lock so `seq` order
        // matches vector order.
        let mut events = self.events.lock();
        events.push(EngineEvent {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            at: Instant::now(),
            thread: thread::current().name().unwrap_or("<unnamed>").to_string(),
            handle,
            kind,
        });
    }
}

/// A mock engine whose clones share the same store and event log.
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<EngineState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every open fail until reset.
    pub fn fail_opens(&self, fail: bool) {
        self.state.fail_all_opens.store(fail, Ordering::SeqCst);
    }

    /// Make opens fail only on the thread with this name.
    pub fn fail_opens_on_thread(&self, name: &str) {
        self.state.failing_open_threads.lock().push(name.to_string());
    }

    /// Make every commit fail until reset.
    pub fn fail_commits(&self, fail: bool) {
        self.state.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Read-write handles start inside a transaction someone else owns.
    pub fn simulate_outer_transaction(&self, enabled: bool) {
        self.state.outer_transaction.store(enabled, Ordering::SeqCst);
    }

    /// Inserts committed data directly, bypassing transactions.
    pub fn seed(&self, key: &str, value: &str) {
        self.state
            .committed
            .lock()
            .insert(key.to_string(), value.to_string());
    }

    /// Snapshot of the committed store.
    pub fn committed(&self) -> BTreeMap<String, String> {
        self.state.committed.lock().clone()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.state.events.lock().clone()
    }

    /// Events of one kind, in the order they happened.
    pub fn events_of(&self, kind: EventKind) -> Vec<EngineEvent> {
        self.state
            .events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events_of(kind).len()
    }

    /// Configuration labels passed to `open`, one entry per open call.
    pub fn configuration_labels(&self) -> Vec<Option<String>> {
        self.state.labels.lock().clone()
    }

    /// Highest number of transactions that were ever open at the same time.
    pub fn max_concurrent_transactions(&self) -> usize {
        self.state.max_active_transactions.load(Ordering::SeqCst)
    }

    fn open_handle(
        &self,
        configuration: Option<&MockConfiguration>,
        read_only: bool,
    ) -> Result<MockHandle, BoxError> {
        self.state
            .labels
            .lock()
            .push(configuration.map(|c| c.label.clone()));

        let thread_name = thread::current().name().unwrap_or("<unnamed>").to_string();
        if self.state.fail_all_opens.load(Ordering::SeqCst)
            || self.state.failing_open_threads.lock().contains(&thread_name)
        {
            return Err(format!("injected open failure on `{thread_name}`").into());
        }

        let id = self.state.next_handle.fetch_add(1, Ordering::SeqCst);
        self.state.record(id, EventKind::Opened { read_only });

        let outer = !read_only && self.state.outer_transaction.load(Ordering::SeqCst);
        let snapshot = self.state.committed.lock().clone();
        Ok(MockHandle {
            id,
            state: Arc::clone(&self.state),
            read_only,
            pending: RefCell::new(outer.then(|| snapshot.clone())),
            snapshot: RefCell::new(snapshot),
            _not_send: PhantomData,
        })
    }
}

impl StoreEngine for MockEngine {
    type Handle = MockHandle;
    type Configuration = MockConfiguration;

    fn open(&self, configuration: Option<&MockConfiguration>) -> Result<MockHandle, BoxError> {
        self.open_handle(configuration, false)
    }

    fn open_read_only(
        &self,
        configuration: Option<&MockConfiguration>,
    ) -> Result<MockHandle, BoxError> {
        self.open_handle(configuration, true)
    }
}

/// A thread-confined handle onto the mock store.
pub struct MockHandle {
    id: u64,
    state: Arc<EngineState>,
    read_only: bool,
    snapshot: RefCell<BTreeMap<String, String>>,
    pending: RefCell<Option<BTreeMap<String, String>>>,
    _not_send: PhantomData<Rc<()>>,
}

impl MockHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Reads through the open transaction if there is one.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.pending.borrow().as_ref() {
            Some(pending) => pending.get(key).cloned(),
            None => self.snapshot.borrow().get(key).cloned(),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        match self.pending.borrow().as_ref() {
            Some(pending) => pending.keys().cloned().collect(),
            None => self.snapshot.borrow().keys().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stages a write; requires an open transaction on a read-write handle.
    pub fn put(&self, key: &str, value: &str) -> Result<(), BoxError> {
        if self.read_only {
            return Err("handle is read-only".into());
        }
        match self.pending.borrow_mut().as_mut() {
            Some(pending) => {
                pending.insert(key.to_string(), value.to_string());
                Ok(())
            }
            None => Err("cannot write outside a transaction".into()),
        }
    }
}

impl StoreHandle for MockHandle {
    fn refresh(&self) -> Result<(), BoxError> {
        if self.pending.borrow().is_none() {
            *self.snapshot.borrow_mut() = self.state.committed.lock().clone();
        }
        self.state.record(self.id, EventKind::Refreshed);
        Ok(())
    }

    fn begin_transaction(&self) -> Result<(), BoxError> {
        if self.pending.borrow().is_some() {
            return Err("transaction already open".into());
        }
        *self.pending.borrow_mut() = Some(self.state.committed.lock().clone());

        let active = self.state.active_transactions.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .max_active_transactions
            .fetch_max(active, Ordering::SeqCst);
        self.state.record(self.id, EventKind::Began);
        Ok(())
    }

    fn commit_transaction(&self) -> Result<(), BoxError> {
        if self.state.fail_commits.load(Ordering::SeqCst) {
            self.state.record(self.id, EventKind::CommitFailed);
            return Err("injected commit failure".into());
        }
        let Some(pending) = self.pending.borrow_mut().take() else {
            return Err("no transaction to commit".into());
        };
        *self.state.committed.lock() = pending.clone();
        *self.snapshot.borrow_mut() = pending;

        self.state.record(self.id, EventKind::Committed);
        self.state.active_transactions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback_transaction(&self) -> Result<(), BoxError> {
        if self.pending.borrow_mut().take().is_none() {
            return Err("no transaction to roll back".into());
        }
        self.state.record(self.id, EventKind::RolledBack);
        self.state.active_transactions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_in_transaction(&self) -> bool {
        self.pending.borrow().is_some()
    }
}
