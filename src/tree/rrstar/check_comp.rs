// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The CheckComp procedure of the revised R*-tree
//!
//! Depth-first walk over the overlap dependencies between candidate
//! children, looking for one whose accumulated overlap enlargement stays
//! zero.

use crate::geometry::{Mbr, Measure};
use crate::tree::entry::{Entry, EntryPlugin};
use crate::FP;
use num::Zero;
use ordered_float::OrderedFloat;

pub(crate) struct CheckComp<'a, P: FP, const DIM: usize, PL: EntryPlugin> {
    entries: &'a [Entry<P, DIM, PL>],
    new_mbr: &'a Mbr<P, DIM>,
    measure: Measure,
    /// Accumulated overlap enlargement per candidate
    overlaps: Vec<P>,
    visited: Vec<bool>,
    /// Only candidates below this index participate
    threshold: usize,
}

impl<'a, P: FP, const DIM: usize, PL: EntryPlugin> CheckComp<'a, P, DIM, PL> {
    pub(crate) fn new(
        entries: &'a [Entry<P, DIM, PL>],
        new_mbr: &'a Mbr<P, DIM>,
    ) -> CheckComp<'a, P, DIM, PL> {
        assert!(!entries.is_empty());

        // Volume degenerates when any enlarged candidate is flat
        let use_volume = entries
            .iter()
            .all(|entry| (entry.mbr + *new_mbr).volume() != Zero::zero());

        // The last index at which the first candidate's overlap enlargement
        // is still positive bounds the search
        let mut threshold = 1;
        for i in 1..entries.len().saturating_sub(1) {
            let delta =
                entries[0]
                    .mbr
                    .overlap_enlargement(&entries[i].mbr, new_mbr, Measure::Perimeter);
            if delta > Zero::zero() {
                threshold = i + 1;
            }
        }

        CheckComp {
            entries,
            new_mbr,
            measure: if use_volume {
                Measure::Volume
            } else {
                Measure::Perimeter
            },
            overlaps: vec![Zero::zero(); entries.len()],
            visited: vec![false; entries.len()],
            threshold,
        }
    }

    /// Walk from candidate `t`; `Some` names the first candidate found whose
    /// accumulated overlap enlargement is zero, `None` means the walk
    /// exhausted without one.
    pub(crate) fn run(&mut self, t: usize) -> Option<usize> {
        self.visited[t] = true;

        for j in 0..self.threshold {
            if j == t {
                continue;
            }

            let overlap = self.entries[t].mbr.overlap_enlargement(
                &self.entries[j].mbr,
                self.new_mbr,
                self.measure,
            );
            self.overlaps[t] += overlap;

            if overlap != Zero::zero() && !self.visited[j] {
                let result = self.run(j);
                if result.is_some() {
                    return result;
                }
            }
        }

        if self.overlaps[t] == Zero::zero() {
            Some(t)
        } else {
            None
        }
    }

    /// The visited candidate with the least accumulated overlap
    pub(crate) fn min_overlap(&self) -> usize {
        (0..self.entries.len())
            .filter(|&i| self.visited[i])
            .min_by_key(|&i| OrderedFloat(self.overlaps[i]))
            .unwrap()
    }

    #[cfg(test)]
    fn threshold(&self) -> usize {
        self.threshold
    }

    #[cfg(test)]
    fn visited_set(&self) -> Vec<usize> {
        (0..self.entries.len())
            .filter(|&i| self.visited[i])
            .collect()
    }
}
