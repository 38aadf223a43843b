// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Named counters collected from an index

use std::collections::BTreeMap;

/// A mapping from counter name to value, e.g. `height`, `nodes`, `level_2`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsCollector {
    counters: BTreeMap<String, u64>,
}

impl StatsCollector {
    pub fn new() -> StatsCollector {
        StatsCollector::default()
    }

    /// Set a counter, overwriting any previous value
    pub fn set(&mut self, name: impl Into<String>, value: u64) {
        self.counters.insert(name.into(), value);
    }

    /// Add to a counter, starting from 0 when absent
    pub fn add(&mut self, name: impl Into<String>, amount: u64) {
        *self.counters.entry(name.into()).or_insert(0) += amount;
    }

    /// Read a counter; absent counters read as `None`
    pub fn get(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.counters.iter().map(|(name, &value)| (name.as_str(), value))
    }
}

impl IntoIterator for StatsCollector {
    type Item = (String, u64);
    type IntoIter = std::collections::btree_map::IntoIter<String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counters.into_iter()
    }
}
