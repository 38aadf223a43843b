// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! R*-tree
//!
//! Beckmann, Kriegel, Schneider, Seeger (1990). Differs from the basic
//! skeleton in two ways: the subtree choice just above the leaves minimizes
//! overlap enlargement, and the first overflow of an insert extracts the
//! farthest entries and reinserts them from the top instead of splitting.

use crate::error::IndexError;
use crate::geometry::{Mbr, Measure};
use crate::index::SpatialIndex;
use crate::object::{DataObject, RangeQuery, Results};
use crate::stats::StatsCollector;
use crate::tree::arena::NodeRef;
use crate::tree::entry::{Entry, NoPlugin};
use crate::tree::node::IndexNode;
use crate::tree::rtree::{EntryPos, Rtree, TreeAccess};
use crate::FP;
use num::Zero;
use ordered_float::OrderedFloat;
use tracing::{debug, info};

/// R*-tree with forced reinsertion
#[derive(Debug)]
pub struct RStarTree<P, const DIM: usize, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    tree: Rtree<P, DIM, N>,
    min_fill: usize,
    reinsert_count: usize,
    reinsertions: u64,
}

impl<P, const DIM: usize, N> RStarTree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    /// New tree reinserting `(capacity + 1) / 3` entries per overflow
    pub fn new(min_fill: usize) -> RStarTree<P, DIM, N> {
        RStarTree::with_reinsert_count(min_fill, (N::CAPACITY + 1) / 3)
    }

    pub fn with_reinsert_count(min_fill: usize, reinsert_count: usize) -> RStarTree<P, DIM, N> {
        RStarTree::with_expected(min_fill, reinsert_count, 0)
    }

    /// New tree sized for roughly `expected` objects
    pub fn with_expected(
        min_fill: usize,
        reinsert_count: usize,
        expected: usize,
    ) -> RStarTree<P, DIM, N> {
        assert!(min_fill >= 1, "min_fill({min_fill}) must be at least 1");
        assert!(
            2 * min_fill <= N::CAPACITY,
            "min_fill({min_fill}) must be at most half the capacity({})",
            N::CAPACITY
        );
        assert!(
            reinsert_count >= 1 && reinsert_count + min_fill <= N::CAPACITY + 1,
            "reinsert_count({reinsert_count}) must leave min_fill entries behind"
        );
        info!(
            capacity = N::CAPACITY,
            min_fill, reinsert_count, "creating R*-tree"
        );
        RStarTree {
            tree: Rtree::with_expected(expected),
            min_fill,
            reinsert_count,
            reinsertions: 0,
        }
    }

    /// Insert an entry whose subtree belongs `level` node levels above the
    /// objects. `forbid_reinsert` marks the reinsertion chain, in which
    /// overflows split instead of reinserting again.
    fn insert_at(&mut self, entry: Entry<P, DIM, NoPlugin>, level: usize, forbid_reinsert: bool) {
        // Dig down, enlarging the entries on the way. The last choice before
        // the leaves minimizes overlap enlargement, all others volume
        // enlargement.
        let mut path = vec![EntryPos::Root];

        while path.len() < self.tree.height() - 1 - level {
            let top = *path.last().unwrap();
            let mut parent = self.tree.entry_at(top);
            parent.include(&entry);
            self.tree.set_entry_at(top, parent);

            let node = parent.link.node_ref();
            let slot = if path.len() == self.tree.height() - 2 {
                self.least_overlap_slot(node, &entry)
            } else {
                self.least_enlargement_slot(node, &entry)
            };
            path.push(EntryPos::Slot(node, slot));
        }

        let mut carried = entry;
        let mut current_level = level;
        let mut index = path.len();

        while index > 0 {
            let pos = path[index - 1];
            let target = self.tree.entry_at(pos);
            let node = target.link.node_ref();

            if !self.tree.node(node).is_full() {
                self.tree.node_mut(node).push(carried);
                let mut updated = self.tree.entry_at(pos);
                updated.include(&carried);
                self.tree.set_entry_at(pos, updated);
                return;
            }

            if !forbid_reinsert {
                debug!(level = current_level, "overflow: forced reinsertion");
                self.reinsertions += 1;
                let extracted = self.extract_farthest(pos, carried);

                // The extracted entries may settle elsewhere; restore exact
                // MBRs along the abandoned path before reinserting.
                for &abandoned in path[..index].iter().rev() {
                    let stale = self.tree.entry_at(abandoned);
                    let refreshed = self.tree.entry_of_node(stale.link.node_ref());
                    self.tree.set_entry_at(abandoned, refreshed);
                }

                for extracted_entry in extracted {
                    self.insert_at(extracted_entry, current_level, true);
                }
                return;
            }

            debug!(level = current_level, "overflow: splitting");
            let (_, mut sibling) = self.tree.node_from_entries([carried]);
            let mut original = target;
            self.redistribute(&mut original, &mut sibling);
            self.tree.set_entry_at(pos, original);

            carried = sibling;
            current_level += 1;
            index -= 1;
        }

        let old_root = *self.tree.root();
        let (_, new_root) = self.tree.node_from_entries([old_root, carried]);
        self.tree.add_level(new_root);
    }

    /// Take the node's entries plus `extra`, keep the ones closest to the
    /// node's center, and hand back the farthest `reinsert_count` ordered
    /// closest first.
    fn extract_farthest(
        &mut self,
        pos: EntryPos,
        extra: Entry<P, DIM, NoPlugin>,
    ) -> Vec<Entry<P, DIM, NoPlugin>> {
        let target = self.tree.entry_at(pos);
        let node = target.link.node_ref();
        let center = target.mbr.center();

        let mut entries: Vec<Entry<P, DIM, NoPlugin>> = self.tree.node(node).entries().collect();
        entries.push(extra);
        entries.sort_by_key(|entry| OrderedFloat(entry.mbr.center().distance2(&center)));

        let cut = entries.len() - self.reinsert_count;
        let extracted = entries.split_off(cut);
        self.tree.node_mut(node).assign(entries);

        extracted
    }

    /// The child with the least volume enlargement
    fn least_enlargement_slot(&self, node: NodeRef, entry: &Entry<P, DIM, NoPlugin>) -> usize {
        let node = self.tree.node(node);
        debug_assert!(!node.is_empty());

        (0..node.len())
            .min_by_key(|&slot| OrderedFloat(node.entry(slot).mbr.enlargement(&entry.mbr)))
            .unwrap()
    }

    /// The child whose enlargement increases the overlap with its siblings
    /// the least; near-ties fall to the smaller volume enlargement
    fn least_overlap_slot(&self, node_ref: NodeRef, entry: &Entry<P, DIM, NoPlugin>) -> usize {
        let node = self.tree.node(node_ref);
        debug_assert!(!node.is_empty());
        let threshold = P::from_f64(1e-6).unwrap();

        let mut best = 0;
        let mut best_overlap = P::infinity();

        for slot in 0..node.len() {
            let child = node.entry(slot);
            let enlarged = child.mbr + entry.mbr;
            let growth =
                self.sibling_overlap(node_ref, &enlarged) - self.sibling_overlap(node_ref, &child.mbr);

            if growth < best_overlap {
                best_overlap = growth;
                best = slot;
            } else if (growth - best_overlap).abs() < threshold
                && node.entry(best).mbr.enlargement(&entry.mbr)
                    > child.mbr.enlargement(&entry.mbr)
            {
                best = slot;
            }
        }

        best
    }

    /// Total volume overlap of `mbr` with all children of the node
    fn sibling_overlap(&self, node: NodeRef, mbr: &Mbr<P, DIM>) -> P {
        self.tree
            .node(node)
            .entries()
            .fold(Zero::zero(), |sum, child| {
                sum + mbr.overlap(Measure::Volume, &child.mbr)
            })
    }

    /// Topological split: the dimension with the smallest perimeter sum over
    /// all candidate positions, then the position with the least group
    /// intersection.
    fn redistribute(&mut self, a: &mut Entry<P, DIM, NoPlugin>, b: &mut Entry<P, DIM, NoPlugin>) {
        let mut entries: Vec<Entry<P, DIM, NoPlugin>> = self
            .tree
            .node(a.link.node_ref())
            .entries()
            .chain(self.tree.node(b.link.node_ref()).entries())
            .collect();

        let total = entries.len();
        let m = self.min_fill;
        debug_assert!(total >= 2 * m);

        // Choose the split dimension by the sum of group perimeters
        let mut best_dim = 0;
        let mut best_margin = P::infinity();

        for d in 0..DIM {
            sort_along(&mut entries, d);
            let (prefix, suffix) = group_mbrs(&entries);

            let mut margin: P = Zero::zero();
            for s in m..=total - m {
                margin += prefix[s - 1].perimeter() + suffix[s].perimeter();
            }

            if margin < best_margin {
                best_margin = margin;
                best_dim = d;
            }
        }

        // Fix the dimension; choose the position with the least intersection
        sort_along(&mut entries, best_dim);
        let (prefix, suffix) = group_mbrs(&entries);

        let mut best_split = m;
        let mut best_cost = (OrderedFloat(P::infinity()), OrderedFloat(P::infinity()));

        for s in m..=total - m {
            let mbr_a = prefix[s - 1];
            let mbr_b = suffix[s];
            let cost = (
                OrderedFloat(mbr_a.overlap(Measure::Volume, &mbr_b)),
                OrderedFloat(mbr_a.volume() + mbr_b.volume()),
            );

            if cost < best_cost {
                best_cost = cost;
                best_split = s;
            }
        }

        let group_b = entries.split_off(best_split);

        let node_a = a.link.node_ref();
        let node_b = b.link.node_ref();
        self.tree.node_mut(node_a).assign(entries);
        self.tree.node_mut(node_b).assign(group_b);
        *a = self.tree.entry_of_node(node_a);
        *b = self.tree.entry_of_node(node_b);
    }
}

/// Sort by `(low, high)` along the axis
fn sort_along<P: FP, const DIM: usize>(entries: &mut [Entry<P, DIM, NoPlugin>], axis: usize) {
    entries.sort_by_key(|entry| {
        (
            OrderedFloat(entry.mbr.low()[axis]),
            OrderedFloat(entry.mbr.high()[axis]),
        )
    });
}

/// Running unions from the front and from the back:
/// `prefix[i]` covers `entries[..=i]`, `suffix[i]` covers `entries[i..]`
fn group_mbrs<P: FP, const DIM: usize>(
    entries: &[Entry<P, DIM, NoPlugin>],
) -> (Vec<Mbr<P, DIM>>, Vec<Mbr<P, DIM>>) {
    let mut prefix = Vec::with_capacity(entries.len());
    let mut running = Mbr::inverted();
    for entry in entries {
        running += entry.mbr;
        prefix.push(running);
    }

    let mut suffix = vec![Mbr::inverted(); entries.len() + 1];
    let mut running = Mbr::inverted();
    for (i, entry) in entries.iter().enumerate().rev() {
        running += entry.mbr;
        suffix[i] = running;
    }

    (prefix, suffix)
}

impl<P, const DIM: usize, N> SpatialIndex<P, DIM> for RStarTree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    fn insert(&mut self, object: DataObject<P, DIM>) {
        let entry = Entry::object(&object);

        if self.tree.height() == 0 {
            self.tree.add_level(entry);
            return;
        }

        if self.tree.height() == 1 {
            let old_root = *self.tree.root();
            let (_, root_entry) = self.tree.node_from_entries([old_root, entry]);
            self.tree.add_level(root_entry);
            return;
        }

        self.insert_at(entry, 0, false);
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
        stats.set("reinsertions", self.reinsertions);
        stats
    }

    fn check_structure(&self) -> Result<(), IndexError> {
        self.tree.check_structure(self.min_fill)
    }
}

impl<P, const DIM: usize, N> TreeAccess<P, DIM> for RStarTree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    type Node = N;

    fn tree(&self) -> &Rtree<P, DIM, N> {
        &self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectId;
    use crate::tree::default_node::DefaultNode;

    type Tree = RStarTree<f64, 2, DefaultNode<f64, 2, 8>>;

    fn point_box(x: f64) -> Mbr<f64, 2> {
        Mbr::new([x, 0.0], [x + 0.5, 0.5])
    }

    /// Nine points along the x axis overflow a capacity-8 node on the ninth
    /// insert; the first overflow reinserts instead of splitting.
    #[test]
    fn reinsertion_fires_before_any_split() {
        let mut tree = Tree::with_reinsert_count(2, 3);

        for i in 0..8u64 {
            tree.insert(DataObject::new(ObjectId(i + 1), point_box(i as f64)));
            tree.check_structure().unwrap();
        }

        // eight objects fit the root node without any overflow handling
        let stats = tree.collect_statistics();
        assert_eq!(stats.get("height"), Some(2));
        assert_eq!(stats.get("reinsertions"), Some(0));

        // the ninth insert overflows; reinsertion fires before any split
        tree.insert(DataObject::new(ObjectId(9), point_box(8.0)));
        tree.check_structure().unwrap();

        let stats = tree.collect_statistics();
        assert_eq!(stats.get("reinsertions"), Some(1));
        assert!((2..=3).contains(&stats.get("height").unwrap()));

        // keep inserting until the node fills again and actually splits
        for i in 9..20u64 {
            tree.insert(DataObject::new(ObjectId(i + 1), point_box(i as f64)));
            tree.check_structure().unwrap();
        }

        let stats = tree.collect_statistics();
        let height = stats.get("height").unwrap();
        assert!((2..=3).contains(&height));
        assert!(stats.get("nodes").unwrap() >= 2);

        // everything is still findable
        let mut results = Results::new();
        tree.search(
            &RangeQuery::new(Mbr::new([-1.0, -1.0], [30.0, 1.0])),
            &mut results,
        );
        results.sort();
        assert_eq!(results.len(), 20);
    }

    #[test]
    fn knn_search_is_unsupported() {
        let tree = Tree::new(2);
        let mut results = Results::new();
        let err = tree
            .knn_search(3, &crate::geometry::Point::new([0.0, 0.0]), &mut results)
            .unwrap_err();
        assert_eq!(err, IndexError::Unsupported("k-NN search"));
    }
}
