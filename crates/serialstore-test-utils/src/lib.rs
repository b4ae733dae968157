// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for SerialStore integration tests.
//!
//! Provides an instrumented engine and context helpers for fast,
//! deterministic tests without a real database.
//!
//! # Components
//!
//! - [`MockEngine`] - In-memory engine recording begin/commit/rollback events
//! - [`harness`] - Caller contexts and completion waiting

pub mod harness;
pub mod mock_engine;

pub use harness::{blocking_completion, caller_context, completion, drain, issue_from, run_on};
pub use mock_engine::{EngineEvent, EventKind, MockConfiguration, MockEngine, MockHandle};
