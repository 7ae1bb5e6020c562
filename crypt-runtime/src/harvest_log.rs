//! Append-only history of harvest outcomes.
//!
//! Entries are never mutated or reordered. `last_n` walks the tail newest
//! first; averages are taken over that same window.

use serde::{Deserialize, Serialize};

use crate::types::HarvestRecord;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestLedger {
    entries: Vec<HarvestRecord>,
}

impl HarvestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: HarvestRecord) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry by append index, including ones outside any rolling window.
    pub fn get(&self, index: usize) -> Option<&HarvestRecord> {
        self.entries.get(index)
    }

    pub fn latest(&self) -> Option<&HarvestRecord> {
        self.entries.last()
    }

    /// The most recent `min(n, len)` entries, newest first. Cloning the
    /// iterator restarts the walk.
    pub fn last_n(&self, n: usize) -> LastN<'_> {
        let start = self.entries.len().saturating_sub(n);
        LastN {
            inner: self.entries[start..].iter().rev(),
        }
    }

    /// Mean APR over the last `n` entries. `n` is clamped to the ledger
    /// length; an empty window averages to 0.
    pub fn average_apr(&self, n: usize) -> u64 {
        let (sum, count) = self
            .last_n(n)
            .fold((0u128, 0u128), |(sum, count), entry| {
                (sum + u128::from(entry.apr_bps), count + 1)
            });
        if count == 0 {
            return 0;
        }
        (sum / count) as u64
    }
}

#[derive(Debug, Clone)]
pub struct LastN<'a> {
    inner: std::iter::Rev<std::slice::Iter<'a, HarvestRecord>>,
}

impl<'a> Iterator for LastN<'a> {
    type Item = &'a HarvestRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for LastN<'_> {}
