// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! R-tree with the quadratic split suggested by Guttman

use crate::error::IndexError;
use crate::index::SpatialIndex;
use crate::object::{DataObject, RangeQuery, Results};
use crate::stats::StatsCollector;
use crate::tree::arena::NodeRef;
use crate::tree::basic::{insert_object, SplitPolicy};
use crate::tree::entry::{Entry, NoPlugin};
use crate::tree::node::IndexNode;
use crate::tree::rtree::{Rtree, TreeAccess};
use crate::FP;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use tracing::info;

/// The child requiring the least volume enlargement to take `entry`, ties
/// broken by the smaller volume. Shared with the Greene variant.
pub(crate) fn least_enlargement_slot<P, const DIM: usize, N>(
    tree: &Rtree<P, DIM, N>,
    node: NodeRef,
    entry: &Entry<P, DIM, N::Plugin>,
) -> usize
where
    P: FP,
    N: IndexNode<P, DIM>,
{
    let node = tree.node(node);
    debug_assert!(!node.is_empty());

    (0..node.len())
        .min_by_key(|&slot| {
            let child = node.entry(slot);
            (
                OrderedFloat(child.mbr.enlargement(&entry.mbr)),
                OrderedFloat(child.mbr.volume()),
            )
        })
        .unwrap()
}

/// Pool the children of `a` and `b` and write the two groups back, refreshing
/// both handle entries
pub(crate) fn commit_groups<P, const DIM: usize, N>(
    tree: &mut Rtree<P, DIM, N>,
    a: &mut Entry<P, DIM, N::Plugin>,
    b: &mut Entry<P, DIM, N::Plugin>,
    group_a: Vec<Entry<P, DIM, N::Plugin>>,
    group_b: Vec<Entry<P, DIM, N::Plugin>>,
) where
    P: FP,
    N: IndexNode<P, DIM>,
{
    let node_a = a.link.node_ref();
    let node_b = b.link.node_ref();

    tree.node_mut(node_a).assign(group_a);
    tree.node_mut(node_b).assign(group_b);

    *a = tree.entry_of_node(node_a);
    *b = tree.entry_of_node(node_b);
}

#[derive(Debug)]
pub(crate) struct QuadraticPolicy {
    pub(crate) min_fill: usize,
}

impl<P, const DIM: usize, N> SplitPolicy<P, DIM, N> for QuadraticPolicy
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    fn choose_subtree(
        &self,
        tree: &Rtree<P, DIM, N>,
        node: NodeRef,
        entry: &Entry<P, DIM, NoPlugin>,
    ) -> usize {
        least_enlargement_slot(tree, node, entry)
    }

    fn redistribute(
        &mut self,
        tree: &mut Rtree<P, DIM, N>,
        a: &mut Entry<P, DIM, NoPlugin>,
        b: &mut Entry<P, DIM, NoPlugin>,
        _level: usize,
    ) {
        let mut entries: Vec<Entry<P, DIM, NoPlugin>> = tree
            .node(a.link.node_ref())
            .entries()
            .chain(tree.node(b.link.node_ref()).entries())
            .collect();

        let total = entries.len();
        assert!(
            total >= 2 * self.min_fill,
            "redistribute requires an overfull node"
        );

        // Seeds: the pair wasting the most space when covered together
        let (seed_a, seed_b) = (0..total)
            .tuple_combinations()
            .max_by_key(|&(i, j)| OrderedFloat(entries[i].mbr.waste(&entries[j].mbr)))
            .unwrap();

        let mut group_a = vec![entries[seed_a]];
        let mut group_b = vec![entries[seed_b]];
        let mut mbr_a = entries[seed_a].mbr;
        let mut mbr_b = entries[seed_b].mbr;

        // seed_a < seed_b, so seed_a cannot be the last element
        entries.swap_remove(seed_b);
        entries.swap_remove(seed_a);

        while !entries.is_empty() {
            // Force the remainder into the underfull group when the other
            // one has taken all it can
            if group_a.len() >= total - self.min_fill {
                group_b.append(&mut entries);
                break;
            }
            if group_b.len() >= total - self.min_fill {
                group_a.append(&mut entries);
                break;
            }

            // The entry for which the choice of group matters most
            let pick = (0..entries.len())
                .max_by_key(|&i| {
                    let delta_a = mbr_a.enlargement(&entries[i].mbr);
                    let delta_b = mbr_b.enlargement(&entries[i].mbr);
                    OrderedFloat((delta_a - delta_b).abs())
                })
                .unwrap();
            let entry = entries.swap_remove(pick);

            let cost_a = (
                OrderedFloat(mbr_a.enlargement(&entry.mbr)),
                OrderedFloat(mbr_a.volume()),
                group_a.len(),
            );
            let cost_b = (
                OrderedFloat(mbr_b.enlargement(&entry.mbr)),
                OrderedFloat(mbr_b.volume()),
                group_b.len(),
            );

            if cost_a > cost_b {
                group_b.push(entry);
                mbr_b += entry.mbr;
            } else {
                group_a.push(entry);
                mbr_a += entry.mbr;
            }
        }

        debug_assert!(group_a.len() >= self.min_fill && group_b.len() >= self.min_fill);

        commit_groups(tree, a, b, group_a, group_b);
    }
}

/// R-tree with Guttman's quadratic split.
///
/// `chooseSubtree` picks the child with the least volume enlargement; splits
/// seed the two groups with the pair of entries wasting the most space.
#[derive(Debug)]
pub struct QuadraticRtree<P, const DIM: usize, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    tree: Rtree<P, DIM, N>,
    policy: QuadraticPolicy,
}

impl<P, const DIM: usize, N> QuadraticRtree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    /// New tree with the given minimum node fill (`2 * min_fill <= capacity`)
    pub fn new(min_fill: usize) -> QuadraticRtree<P, DIM, N> {
        QuadraticRtree::with_expected(min_fill, 0)
    }

    /// New tree sized for roughly `expected` objects
    pub fn with_expected(min_fill: usize, expected: usize) -> QuadraticRtree<P, DIM, N> {
        assert!(min_fill >= 1, "min_fill({min_fill}) must be at least 1");
        assert!(
            2 * min_fill <= N::CAPACITY,
            "min_fill({min_fill}) must be at most half the capacity({})",
            N::CAPACITY
        );
        info!(
            capacity = N::CAPACITY,
            min_fill, "creating quadratic R-tree"
        );
        QuadraticRtree {
            tree: Rtree::with_expected(expected),
            policy: QuadraticPolicy { min_fill },
        }
    }
}

impl<P, const DIM: usize, N> SpatialIndex<P, DIM> for QuadraticRtree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = NoPlugin>,
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
        self.tree.collect_statistics()
    }

    fn check_structure(&self) -> Result<(), IndexError> {
        self.tree.check_structure(self.policy.min_fill)
    }
}

impl<P, const DIM: usize, N> TreeAccess<P, DIM> for QuadraticRtree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    type Node = N;

    fn tree(&self) -> &Rtree<P, DIM, N> {
        &self.tree
    }
}
