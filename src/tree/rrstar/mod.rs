// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Revised R*-tree
//!
//! Beckmann and Seeger (2009). Subtree choice prefers covering children and
//! otherwise runs CheckComp over the overlap dependencies; splits are chosen
//! by the goal function weighted towards balanced positions, with the node's
//! captured original MBR steering the weighting asymmetry.

mod check_comp;
mod split;

use crate::error::IndexError;
use crate::geometry::{Mbr, Measure};
use crate::index::SpatialIndex;
use crate::object::{DataObject, RangeQuery, Results};
use crate::stats::StatsCollector;
use crate::tree::arena::NodeRef;
use crate::tree::basic::{insert_object, SplitPolicy};
use crate::tree::entry::{CapturedCenterPlugin, Entry};
use crate::tree::node::IndexNode;
use crate::tree::rtree::{Rtree, TreeAccess};
use crate::FP;
use self::check_comp::CheckComp;
use self::split::{AxisSplits, GoalFunction, WeightingFunction, SORT_ORDERS};
use num::Zero;
use ordered_float::OrderedFloat;
use tracing::info;

#[derive(Debug)]
struct RRStarPolicy {
    min_fill: usize,
    perimeter_splits: u64,
    negative_goals: u64,
}

type E<P, const DIM: usize> = Entry<P, DIM, CapturedCenterPlugin>;

impl RRStarPolicy {
    /// Candidate splits for one axis under both sort orders
    fn axis_candidates<P: FP, const DIM: usize>(
        entries: &[E<P, DIM>],
        axis: usize,
    ) -> [AxisSplits<P, DIM, CapturedCenterPlugin>; 2] {
        [
            AxisSplits::new(entries, axis, SORT_ORDERS[0]),
            AxisSplits::new(entries, axis, SORT_ORDERS[1]),
        ]
    }
}

impl<P, const DIM: usize, N> SplitPolicy<P, DIM, N> for RRStarPolicy
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = CapturedCenterPlugin>,
{
    /// Prefer children already covering the new entry; otherwise order the
    /// children by perimeter enlargement and run CheckComp from the best one.
    fn choose_subtree(
        &self,
        tree: &Rtree<P, DIM, N>,
        node: NodeRef,
        entry: &E<P, DIM>,
    ) -> usize {
        let node = tree.node(node);
        debug_assert!(!node.is_empty());

        // Covering children: no enlargement necessary at all
        let covering: Vec<usize> = (0..node.len())
            .filter(|&slot| node.entry(slot).mbr.contains(&entry.mbr))
            .collect();

        if !covering.is_empty() {
            let all_have_volume = covering
                .iter()
                .all(|&slot| node.entry(slot).mbr.volume() != Zero::zero());
            let measure = if all_have_volume {
                Measure::Volume
            } else {
                Measure::Perimeter
            };

            return covering
                .into_iter()
                .min_by_key(|&slot| OrderedFloat(measure.eval(&node.entry(slot).mbr)))
                .unwrap();
        }

        // Sorted view of the children by perimeter enlargement
        let mut order: Vec<usize> = (0..node.len()).collect();
        order.sort_by_key(|&slot| {
            OrderedFloat(node.entry(slot).mbr.delta(Measure::Perimeter, &entry.mbr))
        });
        let sorted: Vec<E<P, DIM>> = order.iter().map(|&slot| node.entry(slot)).collect();

        // The best child wins outright when its enlarged MBR stays clear of
        // every other child
        let clear = sorted[1..].iter().all(|other| {
            sorted[0]
                .mbr
                .overlap_enlargement(&other.mbr, &entry.mbr, Measure::Perimeter)
                == Zero::zero()
        });
        if clear {
            return order[0];
        }

        let mut check = CheckComp::new(&sorted, &entry.mbr);
        match check.run(0) {
            Some(found) => order[found],
            None => order[check.min_overlap()],
        }
    }

    fn redistribute(
        &mut self,
        tree: &mut Rtree<P, DIM, N>,
        a: &mut E<P, DIM>,
        b: &mut E<P, DIM>,
        level: usize,
    ) {
        let node_a = a.link.node_ref();
        let node_b = b.link.node_ref();

        // The original MBR captured when node a was (re)assigned, for the
        // weighting asymmetry
        let captured = tree.node(node_a).data() as usize;
        debug_assert!(captured >= 1 && captured <= tree.node(node_a).len());
        let original = tree
            .node(node_a)
            .entries()
            .take(captured)
            .fold(Mbr::inverted(), |acc, child| acc + child.mbr);

        let entries: Vec<E<P, DIM>> = tree
            .node(node_a)
            .entries()
            .chain(tree.node(node_b).entries())
            .collect();

        let total = entries.len();
        let m = self.min_fill;
        assert!(total >= 2 * m, "redistribute requires an overfull node");

        let goal = GoalFunction::new(&(a.mbr + b.mbr));

        // Leaf splits are restricted to the single axis with the smallest
        // perimeter sum; higher levels search all axes jointly
        let candidates: Vec<AxisSplits<P, DIM, CapturedCenterPlugin>> = if level == 0 {
            let best_axis = (0..DIM)
                .min_by_key(|&axis| {
                    let sum = RRStarPolicy::axis_candidates(&entries, axis)
                        .iter()
                        .fold(P::zero(), |acc, splits| {
                            (m..=total - m).fold(acc, |acc, k| acc + splits.perimeter(k))
                        });
                    OrderedFloat(sum)
                })
                .unwrap();
            RRStarPolicy::axis_candidates(&entries, best_axis).into()
        } else {
            (0..DIM)
                .flat_map(|axis| RRStarPolicy::axis_candidates(&entries, axis))
                .collect()
        };

        // Volume only works as the overlap measure when no candidate split
        // produces a flat group
        let use_volume = candidates
            .iter()
            .all(|splits| (m..=total - m).all(|k| splits.has_volume(k)));
        let measure = if use_volume {
            Measure::Volume
        } else {
            self.perimeter_splits += 1;
            Measure::Perimeter
        };

        // The split minimizing the weighted goal
        let mut best: Option<(P, usize, usize, P)> = None;

        for (index, splits) in candidates.iter().enumerate() {
            let weighting =
                WeightingFunction::new(N::CAPACITY, m, &a.mbr, &original, splits.axis);

            for k in m..=total - m {
                let (mbr_a, mbr_b) = splits.group_mbrs(k);
                let g = goal.eval(&mbr_a, &mbr_b, measure);
                let f: P = weighting.eval(k);
                let score = if g < Zero::zero() { g * f } else { g / f };

                if best.map_or(true, |(best_score, ..)| score < best_score) {
                    best = Some((score, index, k, g));
                }
            }
        }

        let (_, index, k, g) = best.unwrap();
        if g < Zero::zero() {
            self.negative_goals += 1;
        }

        let (group_a, group_b) = candidates[index].partition(k);
        tree.node_mut(node_a).assign(group_a);
        tree.node_mut(node_b).assign(group_b);
        *a = tree.entry_of_node(node_a);
        *b = tree.entry_of_node(node_b);
    }
}

/// Revised R*-tree
#[derive(Debug)]
pub struct RRStarTree<P, const DIM: usize, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = CapturedCenterPlugin>,
{
    tree: Rtree<P, DIM, N>,
    policy: RRStarPolicy,
}

impl<P, const DIM: usize, N> RRStarTree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = CapturedCenterPlugin>,
{
    /// New tree with the given minimum node fill (`2 * min_fill <= capacity`)
    pub fn new(min_fill: usize) -> RRStarTree<P, DIM, N> {
        RRStarTree::with_expected(min_fill, 0)
    }

    /// New tree sized for roughly `expected` objects
    pub fn with_expected(min_fill: usize, expected: usize) -> RRStarTree<P, DIM, N> {
        assert!(min_fill >= 1, "min_fill({min_fill}) must be at least 1");
        assert!(
            2 * min_fill <= N::CAPACITY,
            "min_fill({min_fill}) must be at most half the capacity({})",
            N::CAPACITY
        );
        info!(
            capacity = N::CAPACITY,
            min_fill, "creating revised R*-tree"
        );
        RRStarTree {
            tree: Rtree::with_expected(expected),
            policy: RRStarPolicy {
                min_fill,
                perimeter_splits: 0,
                negative_goals: 0,
            },
        }
    }
}

impl<P, const DIM: usize, N> SpatialIndex<P, DIM> for RRStarTree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = CapturedCenterPlugin>,
{
    fn insert(&mut self, object: DataObject<P, DIM>) {
        insert_object(&mut self.tree, &mut self.policy, &object);
    }

    fn search(&self, query: &RangeQuery<P, DIM>, results: &mut Results) {
        self.tree.range_search(query.mbr(), results);
    }

    fn search_with_stats(
        &self,
        query: &RangeQuery<P, DIM>,
        results: &mut Results,
        stats: &mut StatsCollector,
    ) {
        self.tree.range_search_with_stats(query.mbr(), results, stats);
    }

    fn collect_statistics(&self) -> StatsCollector {
        let mut stats = self.tree.collect_statistics();
        stats.set("perimeter_splits", self.policy.perimeter_splits);
        stats.set("negative_goals", self.policy.negative_goals);
        stats
    }

    fn check_structure(&self) -> Result<(), IndexError> {
        self.tree.check_structure(self.policy.min_fill)
    }
}

impl<P, const DIM: usize, N> TreeAccess<P, DIM> for RRStarTree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = CapturedCenterPlugin>,
{
    type Node = N;

    fn tree(&self) -> &Rtree<P, DIM, N> {
        &self.tree
    }
}
