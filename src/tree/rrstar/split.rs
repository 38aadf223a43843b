// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Split candidates and the goal and weighting functions of the revised
//! R*-tree

use crate::geometry::{Mbr, Measure};
use crate::tree::entry::{Entry, EntryPlugin};
use crate::FP;
use num::Zero;
use ordered_float::OrderedFloat;

/// The two sort keys a split axis can be enumerated under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortOrder {
    /// `(high, low)`
    HighLow,
    /// `(low, high)`
    LowHigh,
}

pub(crate) const SORT_ORDERS: [SortOrder; 2] = [SortOrder::HighLow, SortOrder::LowHigh];

/// All candidate splits of one axis under one sort order.
///
/// A split is parameterized by the position `k`: the first `k` entries of the
/// sorted order form one group, the rest the other. Valid positions are
/// `min_fill ..= len - min_fill`.
#[derive(Debug)]
pub(crate) struct AxisSplits<P, const DIM: usize, PL> {
    pub(crate) axis: usize,
    pub(crate) sort: SortOrder,
    order: Vec<Entry<P, DIM, PL>>,
    /// `prefix[i]` covers `order[..=i]`
    prefix: Vec<Mbr<P, DIM>>,
    /// `suffix[i]` covers `order[i..]`
    suffix: Vec<Mbr<P, DIM>>,
}

impl<P: FP, const DIM: usize, PL: EntryPlugin> AxisSplits<P, DIM, PL> {
    pub(crate) fn new(
        entries: &[Entry<P, DIM, PL>],
        axis: usize,
        sort: SortOrder,
    ) -> AxisSplits<P, DIM, PL> {
        let mut order = entries.to_vec();
        match sort {
            SortOrder::HighLow => order.sort_by_key(|entry| {
                (
                    OrderedFloat(entry.mbr.high()[axis]),
                    OrderedFloat(entry.mbr.low()[axis]),
                )
            }),
            SortOrder::LowHigh => order.sort_by_key(|entry| {
                (
                    OrderedFloat(entry.mbr.low()[axis]),
                    OrderedFloat(entry.mbr.high()[axis]),
                )
            }),
        }

        let mut prefix = Vec::with_capacity(order.len());
        let mut running = Mbr::inverted();
        for entry in &order {
            running += entry.mbr;
            prefix.push(running);
        }

        let mut suffix = vec![Mbr::inverted(); order.len() + 1];
        let mut running = Mbr::inverted();
        for (i, entry) in order.iter().enumerate().rev() {
            running += entry.mbr;
            suffix[i] = running;
        }

        AxisSplits {
            axis,
            sort,
            order,
            prefix,
            suffix,
        }
    }

    /// MBRs of the two groups split at `k`
    pub(crate) fn group_mbrs(&self, k: usize) -> (Mbr<P, DIM>, Mbr<P, DIM>) {
        debug_assert!(k >= 1 && k < self.order.len());
        (self.prefix[k - 1], self.suffix[k])
    }

    /// Sum of the two group perimeters at `k`
    pub(crate) fn perimeter(&self, k: usize) -> P {
        let (a, b) = self.group_mbrs(k);
        a.perimeter() + b.perimeter()
    }

    /// Whether both groups at `k` have volume
    pub(crate) fn has_volume(&self, k: usize) -> bool {
        let (a, b) = self.group_mbrs(k);
        a.volume() != Zero::zero() && b.volume() != Zero::zero()
    }

    /// The two groups split at `k`
    pub(crate) fn partition(&self, k: usize) -> (Vec<Entry<P, DIM, PL>>, Vec<Entry<P, DIM, PL>>) {
        (self.order[..k].to_vec(), self.order[k..].to_vec())
    }
}

/// The goal function: the measured overlap of a split's groups, or, for
/// overlap-free splits, the total perimeter shifted down by the worst
/// possible perimeter so that overlap-free splits always score negative.
#[derive(Debug)]
pub(crate) struct GoalFunction<P> {
    max_perimeter: P,
}

impl<P: FP> GoalFunction<P> {
    pub(crate) fn new<const DIM: usize>(enclosing: &Mbr<P, DIM>) -> GoalFunction<P> {
        let min_projection = (0..DIM)
            .map(|d| enclosing.high()[d] - enclosing.low()[d])
            .fold(P::infinity(), |acc, extent| acc.min(extent));

        let two = P::one() + P::one();
        GoalFunction {
            max_perimeter: two * enclosing.perimeter() - min_projection,
        }
    }

    pub(crate) fn eval<const DIM: usize>(
        &self,
        a: &Mbr<P, DIM>,
        b: &Mbr<P, DIM>,
        measure: Measure,
    ) -> P {
        let overlap = a.overlap(measure, b);

        if overlap != Zero::zero() {
            debug_assert!(overlap > Zero::zero());
            return overlap;
        }

        a.perimeter() + b.perimeter() - self.max_perimeter
    }

    #[cfg(test)]
    pub(crate) fn max_perimeter(&self) -> P {
        self.max_perimeter
    }
}

/// The split weighting function.
///
/// A bell over the split position, centered between the valid positions but
/// shifted towards the end the node's MBR has drifted away from since the
/// node was created. Precalculates everything that only depends on the axis.
#[derive(Debug)]
pub(crate) struct WeightingFunction {
    pre_shift: f64,
    pre_scale: f64,
    shift: f64,
    scale: f64,
}

const S: f64 = 0.5;

impl WeightingFunction {
    pub(crate) fn new<P: FP, const DIM: usize>(
        capacity: usize,
        min_fill: usize,
        current: &Mbr<P, DIM>,
        original: &Mbr<P, DIM>,
        axis: usize,
    ) -> WeightingFunction {
        debug_assert!(2 * min_fill <= capacity);

        let low = current.low()[axis].to_f64().unwrap();
        let high = current.high()[axis].to_f64().unwrap();
        let original_low = original.low()[axis].to_f64().unwrap();
        let original_high = original.high()[axis].to_f64().unwrap();

        let width = high - low;
        let asym = if width == 0.0 {
            0.0
        } else {
            ((high + low) - (original_high + original_low)) / width
        };
        debug_assert!(asym.abs() <= 1.0 + 1e-9);

        let capacity = capacity as f64;
        let min_fill = min_fill as f64;
        let spread = capacity + 1.0 - 2.0 * min_fill;

        let shift = (-1.0 / (S * S)).exp();

        WeightingFunction {
            pre_shift: 0.5 * (capacity - 1.0 + spread * asym),
            pre_scale: 2.0 / (S * (capacity + 1.0 + spread * asym.abs())),
            shift,
            scale: 1.0 / (1.0 - shift),
        }
    }

    pub(crate) fn eval<P: FP>(&self, k: usize) -> P {
        let e = self.pre_scale * (k as f64 - self.pre_shift);
        let value = self.scale * ((-e * e).exp() - self.shift);
        debug_assert!(value.abs() <= 1.0 + 1e-9);
        P::from_f64(value).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{DataObject, ObjectId};
    use crate::tree::entry::NoPlugin;
    use approx::assert_relative_eq;

    fn entry(id: u64, low: [f64; 2], high: [f64; 2]) -> Entry<f64, 2, NoPlugin> {
        Entry::object(&DataObject::new(ObjectId(id), Mbr::new(low, high)))
    }

    /// Weighting test case derived from the graph in the paper:
    /// capacity 100, minimum fill 15, one axis per asymmetry value.
    #[test]
    fn weighting_follows_the_paper_graph() {
        let current = Mbr::new([-0.5f64, -0.25, 0.0], [0.5, 0.75, 1.0]);
        let original = Mbr::from_point(crate::geometry::Point::new([0.0f64, 0.0, 0.0]));

        let check = |axis: usize, expected: [f64; 11]| {
            let wf = WeightingFunction::new(100, 15, &current, &original, axis);
            for (i, &value) in expected.iter().enumerate() {
                let result: f64 = wf.eval(10 * i);
                assert!(
                    (result - value).abs() < 0.04,
                    "axis {axis}, split {}: expected {value}, got {result}",
                    10 * i
                );
            }
        };

        // asym = 0
        check(0, [0.0, 0.07, 0.22, 0.51, 0.85, 1.0, 0.85, 0.51, 0.22, 0.07, 0.0]);
        // asym = 0.5
        check(1, [0.0, 0.04, 0.12, 0.28, 0.51, 0.76, 0.95, 0.99, 0.87, 0.64, 0.38]);
        // asym = 1.0
        check(2, [0.0, 0.03, 0.08, 0.18, 0.31, 0.5, 0.7, 0.88, 0.98, 0.98, 0.88]);
    }

    /// Goal function on three boxes whose enclosing MBR has perimeter 12
    #[test]
    fn goal_scores_simple_example() {
        let entries = [
            entry(1, [1.0, 3.0], [3.0, 6.0]),
            entry(2, [0.0, 2.0], [5.0, 5.0]),
            entry(3, [6.0, 3.5], [8.0, 4.5]),
        ];

        let enclosing = entries
            .iter()
            .fold(Mbr::inverted(), |acc, entry| acc + entry.mbr);
        let goal = GoalFunction::new(&enclosing);

        assert_relative_eq!(goal.max_perimeter(), 20.0);

        // indexed by axis, sort order, split position
        let scores = [
            [[4.0, -8.0], [8.0, -8.0]],
            [[-8.0, 4.0], [8.0, -8.0]],
        ];

        for (d, by_sort) in scores.iter().enumerate() {
            for (s, by_split) in by_sort.iter().enumerate() {
                let splits = AxisSplits::new(&entries, d, SORT_ORDERS[s]);
                for (i, &expected) in by_split.iter().enumerate() {
                    let k = i + 1;
                    let (a, b) = splits.group_mbrs(k);
                    assert_relative_eq!(goal.eval(&a, &b, Measure::Volume), expected);
                }
            }
        }
    }

    /// Split positions run `min_fill ..= len - min_fill` and the sorted
    /// orders put every entry in exactly one group
    #[test]
    fn partitions_cover_all_entries() {
        let entries = [
            entry(1, [0.0, 4.0], [6.0, 8.0]),
            entry(2, [1.0, 3.0], [7.0, 6.0]),
            entry(3, [2.0, 2.0], [9.0, 7.0]),
            entry(4, [3.0, 1.0], [8.0, 9.0]),
            entry(5, [4.0, 0.0], [5.0, 5.0]),
        ];

        for d in 0..2 {
            for sort in SORT_ORDERS {
                let splits = AxisSplits::new(&entries, d, sort);
                for k in 1..=4 {
                    let (a, b) = splits.partition(k);
                    assert_eq!(a.len(), k);
                    assert_eq!(a.len() + b.len(), entries.len());

                    let (mbr_a, mbr_b) = splits.group_mbrs(k);
                    let union_a = a.iter().fold(Mbr::inverted(), |acc, e| acc + e.mbr);
                    let union_b = b.iter().fold(Mbr::inverted(), |acc, e| acc + e.mbr);
                    assert_eq!(mbr_a, union_a);
                    assert_eq!(mbr_b, union_b);
                }
            }
        }
    }
}
