// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The record type the CLI stores.

use serde::{Deserialize, Serialize};
use serialstore_sqlite::Record;

/// A string value stored under a string key.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Whether `needle` occurs in the key or the value.
    pub fn mentions(&self, needle: &str) -> bool {
        self.key.contains(needle) || self.value.contains(needle)
    }
}

impl Record for Entry {
    const KIND: &'static str = "entry";
    type Key = String;

    fn key(&self) -> String {
        self.key.clone()
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }
}
