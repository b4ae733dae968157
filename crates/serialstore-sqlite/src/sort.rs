// SPDX-FileCopyrightText: 2026 SerialStore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory ordering of fetched records.

use std::cmp::Ordering;
use std::fmt;

type Comparator<R> = Box<dyn Fn(&R, &R) -> Ordering + Send + Sync>;

/// Orders records by one extracted key.
pub struct SortDescriptor<R> {
    compare: Comparator<R>,
    ascending: bool,
}

impl<R> SortDescriptor<R> {
    pub fn ascending<K, F>(key: F) -> Self
    where
        K: Ord,
        F: Fn(&R) -> K + Send + Sync + 'static,
    {
        Self {
            compare: Box::new(move |a, b| key(a).cmp(&key(b))),
            ascending: true,
        }
    }

    pub fn descending<K, F>(key: F) -> Self
    where
        K: Ord,
        F: Fn(&R) -> K + Send + Sync + 'static,
    {
        Self {
            compare: Box::new(move |a, b| key(b).cmp(&key(a))),
            ascending: false,
        }
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn compare(&self, a: &R, b: &R) -> Ordering {
        (self.compare)(a, b)
    }
}

impl<R> fmt::Debug for SortDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortDescriptor")
            .field("ascending", &self.ascending)
            .finish_non_exhaustive()
    }
}

/// A comparator that applies `descriptors` in order, each breaking the ties
/// left by the ones before it. An empty slice leaves everything equal.
pub fn combine<R>(descriptors: &[SortDescriptor<R>]) -> impl Fn(&R, &R) -> Ordering + '_ {
    move |a, b| {
        descriptors
            .iter()
            .map(|d| d.compare(a, b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}
