// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! R-tree with Greene's split strategy
//!
//! Subtree choice is the quadratic rule; only the split differs: seeds are
//! the most distant pair of entry centers, the split dimension is the one
//! with the largest seed separation normalized by the enclosing extent, and
//! the sorted entries are cut at the integer midpoint `n/2 - 1`.

use crate::error::IndexError;
use crate::index::SpatialIndex;
use crate::object::{DataObject, RangeQuery, Results};
use crate::stats::StatsCollector;
use crate::tree::arena::NodeRef;
use crate::tree::basic::{insert_object, SplitPolicy};
use crate::tree::entry::{Entry, NoPlugin};
use crate::tree::node::IndexNode;
use crate::tree::quadratic::{commit_groups, least_enlargement_slot};
use crate::tree::rtree::{Rtree, TreeAccess};
use crate::FP;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use tracing::info;

#[derive(Debug)]
struct GreenePolicy {
    min_fill: usize,
}

impl<P, const DIM: usize, N> SplitPolicy<P, DIM, N> for GreenePolicy
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
        // redistribute is only ever handed an overfull node
        assert!(
            total >= 2 * self.min_fill + 1,
            "redistribute requires an overfull node"
        );

        // Seeds: the most distant pair of centers
        let (seed_a, seed_b) = (0..total)
            .tuple_combinations()
            .max_by_key(|&(i, j)| {
                OrderedFloat(
                    entries[i]
                        .mbr
                        .center()
                        .distance2(&entries[j].mbr.center()),
                )
            })
            .unwrap();

        // Split dimension: largest seed separation, normalized by the
        // enclosing extent
        let enclosing = a.mbr + b.mbr;
        let split_dim = (0..DIM)
            .max_by_key(|&d| {
                let separation = entries[seed_a].mbr.distance_along(d, &entries[seed_b].mbr);
                let extent = enclosing.high()[d] - enclosing.low()[d];
                OrderedFloat(separation / extent)
            })
            .unwrap();

        entries.sort_by_key(|entry| OrderedFloat(entry.mbr.low()[split_dim]));

        let group_b = entries.split_off(total / 2 - 1);
        commit_groups(tree, a, b, entries, group_b);
    }
}

/// R-tree with Greene's split strategy
#[derive(Debug)]
pub struct GreeneRtree<P, const DIM: usize, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    tree: Rtree<P, DIM, N>,
    policy: GreenePolicy,
}

impl<P, const DIM: usize, N> GreeneRtree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    /// New tree with the given minimum node fill (`2 * min_fill <= capacity`)
    pub fn new(min_fill: usize) -> GreeneRtree<P, DIM, N> {
        GreeneRtree::with_expected(min_fill, 0)
    }

    /// New tree sized for roughly `expected` objects
    pub fn with_expected(min_fill: usize, expected: usize) -> GreeneRtree<P, DIM, N> {
        assert!(min_fill >= 1, "min_fill({min_fill}) must be at least 1");
        assert!(
            2 * min_fill <= N::CAPACITY,
            "min_fill({min_fill}) must be at most half the capacity({})",
            N::CAPACITY
        );
        info!(capacity = N::CAPACITY, min_fill, "creating Greene R-tree");
        GreeneRtree {
            tree: Rtree::with_expected(expected),
            policy: GreenePolicy { min_fill },
        }
    }
}

impl<P, const DIM: usize, N> SpatialIndex<P, DIM> for GreeneRtree<P, DIM, N>
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

impl<P, const DIM: usize, N> TreeAccess<P, DIM> for GreeneRtree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    type Node = N;

    fn tree(&self) -> &Rtree<P, DIM, N> {
        &self.tree
    }
}
