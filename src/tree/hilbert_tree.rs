// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Hilbert R-tree
//!
//! Keeps every node's entries sorted by Hilbert value and splits in the
//! B-tree manner: an overflowing node first tries to share entries with up to
//! `share` siblings; only when the whole window is full is a new node
//! allocated and the window's entries dealt out evenly.

use crate::error::IndexError;
use crate::geometry::Mbr;
use crate::hilbert::HilbertCurve;
use crate::index::SpatialIndex;
use crate::object::{DataObject, RangeQuery, Results};
use crate::stats::StatsCollector;
use crate::tree::arena::NodeRef;
use crate::tree::entry::{Entry, HilbertPlugin, Link};
use crate::tree::node::IndexNode;
use crate::tree::rtree::{EntryPos, Rtree, TreeAccess};
use crate::FP;
use tracing::{debug, info};

type E<P, const DIM: usize> = Entry<P, DIM, HilbertPlugin>;

/// R-tree ordered along the Hilbert curve
#[derive(Debug)]
pub struct HilbertRtree<P, const DIM: usize, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = HilbertPlugin>,
{
    tree: Rtree<P, DIM, N>,
    curve: HilbertCurve<DIM>,
    share: usize,
}

impl<P, const DIM: usize, N> HilbertRtree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = HilbertPlugin>,
{
    /// New tree over the given data domain. The bounds normalize every
    /// object's center for the Hilbert encoding; `share` is the number of
    /// siblings considered before a new node is allocated.
    pub fn new(bounds: &Mbr<P, DIM>, share: usize) -> HilbertRtree<P, DIM, N> {
        HilbertRtree::with_expected(bounds, share, 0)
    }

    /// New tree sized for roughly `expected` objects
    pub fn with_expected(
        bounds: &Mbr<P, DIM>,
        share: usize,
        expected: usize,
    ) -> HilbertRtree<P, DIM, N> {
        assert!(share >= 1, "share({share}) must be at least 1");
        info!(capacity = N::CAPACITY, share, "creating Hilbert R-tree");
        HilbertRtree {
            tree: Rtree::with_expected(expected),
            curve: HilbertCurve::new(bounds),
            share,
        }
    }

    /// Re-sort a node by Hilbert value
    fn sort_node(&mut self, node: NodeRef) {
        let mut entries: Vec<E<P, DIM>> = self.tree.node(node).entries().collect();
        entries.sort_by_key(|entry| entry.plugin.value);
        self.tree.node_mut(node).assign(entries);
    }

    /// First child whose largest Hilbert value reaches `value`, or the last
    /// child when none does
    fn choose_slot(&self, node: NodeRef, value: u64) -> usize {
        let node = self.tree.node(node);
        debug_assert!(!node.is_empty());

        for slot in 0..node.len() {
            if node.entry(slot).plugin.value >= value {
                return slot;
            }
        }
        node.len() - 1
    }

    /// The window of up to `share` sibling slots around `slot`, biased
    /// inwards at the ends of the node
    fn neighbor_range(&self, len: usize, slot: usize) -> (usize, usize) {
        let share = self.share as isize;
        let slot_i = slot as isize;
        let len_i = len as isize;

        let start = (slot_i - (share - 1 - (share / 2).min(len_i - slot_i - 1))).max(0);
        let end = (start + share).min(len_i);

        debug_assert!(start >= 0 && start < len_i);
        debug_assert!(end > start && end <= len_i);
        debug_assert!(slot_i >= start && slot_i < end);

        (start as usize, end as usize)
    }

    /// The nearest sibling slot in the window with free space, probing
    /// alternately outwards from `slot`
    fn locate_neighbor(
        &self,
        parent: NodeRef,
        slot: usize,
        start: usize,
        end: usize,
    ) -> Option<usize> {
        let mut offset: isize = 1;
        let mut bounds_hit = 0;
        let mut probed = 0;

        while bounds_hit < 2 && probed < self.share {
            let slot_i = slot as isize;
            let in_range = if offset < 0 {
                slot_i - start as isize >= -offset
            } else {
                end as isize - slot_i > offset
            };

            if in_range {
                let candidate = (slot_i + offset) as usize;
                let child = self.tree.node(parent).entry(candidate).link.node_ref();
                if !self.tree.node(child).is_full() {
                    return Some(candidate);
                }
                bounds_hit = 0;
                probed += 1;
            } else {
                bounds_hit += 1;
            }

            offset = -offset + isize::from(offset < 0);
        }

        None
    }

    /// Pool the entries of the parent slots `start..end` (plus `extra`, when
    /// given), sort them by Hilbert value, and deal them out evenly with the
    /// leftovers going to the first nodes. Every affected parent entry is
    /// recalculated.
    fn redistribute_span(
        &mut self,
        parent: NodeRef,
        start: usize,
        end: usize,
        extra: Option<NodeRef>,
    ) {
        let mut nodes: Vec<NodeRef> = (start..end)
            .map(|slot| self.tree.node(parent).entry(slot).link.node_ref())
            .collect();
        if let Some(extra) = extra {
            nodes.push(extra);
        }

        let mut pool: Vec<E<P, DIM>> = Vec::new();
        for &node in &nodes {
            pool.extend(self.tree.node(node).entries());
        }
        pool.sort_by_key(|entry| entry.plugin.value);

        debug!(
            nodes = nodes.len(),
            entries = pool.len(),
            "redistributing entries across siblings"
        );

        let base = pool.len() / nodes.len();
        let mut leftover = pool.len() % nodes.len();
        let mut next = 0;

        for &node in &nodes {
            let mut take = base;
            if leftover > 0 {
                take += 1;
                leftover -= 1;
            }
            self.tree
                .node_mut(node)
                .assign(pool[next..next + take].iter().copied());
            next += take;
        }
        debug_assert_eq!(next, pool.len());

        for slot in start..end {
            let child = self.tree.node(parent).entry(slot).link.node_ref();
            let refreshed = self.tree.entry_of_node(child);
            self.tree.node_mut(parent).set_entry(slot, refreshed);
        }
    }

    /// Replace the root with a new one holding the old root and the given
    /// entry wrapped in a node, rebalanced between the two
    fn split_root(&mut self, entry: E<P, DIM>) {
        debug!("splitting the root");
        let (_, wrapped) = self.tree.node_from_entries([entry]);
        let old_root = *self.tree.root();
        let (root_node, _) = self.tree.node_from_entries([old_root, wrapped]);
        self.redistribute_span(root_node, 0, 2, None);
        let new_root = self.tree.entry_of_node(root_node);
        self.tree.add_level(new_root);
    }
}

impl<P, const DIM: usize, N> SpatialIndex<P, DIM> for HilbertRtree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = HilbertPlugin>,
{
    fn insert(&mut self, object: DataObject<P, DIM>) {
        let value = self.curve.map(&object.mbr.center());
        let entry = Entry::new(
            object.mbr,
            Link::object(object.id),
            HilbertPlugin { value },
        );

        // No nodes yet: the object becomes the root
        if self.tree.height() == 0 {
            self.tree.add_level(entry);
            return;
        }

        // Single object: build a sorted two-child root
        if self.tree.height() == 1 {
            let old_root = *self.tree.root();
            let (node, _) = self.tree.node_from_entries([old_root, entry]);
            self.sort_node(node);
            let root_entry = self.tree.entry_of_node(node);
            self.tree.add_level(root_entry);
            return;
        }

        // The root covers the new entry from here on
        let mut root = *self.tree.root();
        root.include(&entry);
        self.tree.set_entry_at(EntryPos::Root, root);

        if self.tree.height() == 2 {
            let root_node = self.tree.root().link.node_ref();
            if self.tree.node(root_node).is_full() {
                self.split_root(entry);
            } else {
                self.tree.node_mut(root_node).push(entry);
                self.sort_node(root_node);
            }
            return;
        }

        // Dig down by Hilbert value, updating the entries on the way. The
        // path holds the chosen slots at levels 2 .. height-1.
        let mut path: Vec<(NodeRef, usize)> = Vec::new();
        let root_node = self.tree.root().link.node_ref();
        let slot = self.choose_slot(root_node, value);
        path.push((root_node, slot));

        for _ in 0..self.tree.height().saturating_sub(3) {
            let (node, slot) = *path.last().unwrap();
            let mut chosen = self.tree.node(node).entry(slot);
            chosen.include(&entry);
            self.tree.node_mut(node).set_entry(slot, chosen);

            let child = chosen.link.node_ref();
            let child_slot = self.choose_slot(child, value);
            path.push((child, child_slot));
        }

        if let Some(&(node, slot)) = path.last() {
            let mut chosen = self.tree.node(node).entry(slot);
            chosen.include(&entry);
            self.tree.node_mut(node).set_entry(slot, chosen);
        }

        // Share with siblings or split, bottom-up as long as necessary
        let mut carried = entry;
        let mut index = path.len();

        while index > 0 {
            let (parent, slot) = path[index - 1];
            let destination = self.tree.node(parent).entry(slot).link.node_ref();

            if !self.tree.node(destination).is_full() {
                self.tree.node_mut(destination).push(carried);
                self.sort_node(destination);
                let refreshed = self.tree.entry_of_node(destination);
                self.tree.node_mut(parent).set_entry(slot, refreshed);
                return;
            }

            let (start, end) = self.neighbor_range(self.tree.node(parent).len(), slot);

            if let Some(neighbor) = self.locate_neighbor(parent, slot, start, end) {
                // The nearest sibling takes the entry; rebalance the span
                // between the two affected nodes
                let neighbor_node = self.tree.node(parent).entry(neighbor).link.node_ref();
                self.tree.node_mut(neighbor_node).push(carried);

                let (low, high) = (slot.min(neighbor), slot.max(neighbor));
                self.redistribute_span(parent, low, high + 1, None);
                return;
            }

            // The whole window is full: allocate a new node and deal the
            // window's entries out over it as well
            let (new_node, _) = self.tree.node_from_entries([carried]);
            self.redistribute_span(parent, start, end, Some(new_node));
            carried = self.tree.entry_of_node(new_node);
            index -= 1;
        }

        // The new node became a sibling of the root node's children
        let root_node = self.tree.root().link.node_ref();
        if self.tree.node(root_node).is_full() {
            self.split_root(carried);
        } else {
            self.tree.node_mut(root_node).push(carried);
            self.sort_node(root_node);
            let refreshed = self.tree.entry_of_node(root_node);
            self.tree.set_entry_at(EntryPos::Root, refreshed);
        }
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

    /// The base invariants plus the Hilbert ordering within every node
    fn check_structure(&self) -> Result<(), IndexError> {
        self.tree.check_structure(1)?;

        let mut error: Option<IndexError> = None;
        self.tree.traverse(|entry, level| {
            if error.is_some() {
                return false;
            }

            let node = self.tree.node(entry.link.node_ref());
            let mut previous = 0u64;
            for child in node.entries() {
                if child.plugin.value < previous {
                    error = Some(IndexError::InvalidStructure {
                        reason: "entries not in Hilbert order".into(),
                        level,
                    });
                    return false;
                }
                previous = child.plugin.value;
            }
            true
        });

        match error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl<P, const DIM: usize, N> TreeAccess<P, DIM> for HilbertRtree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM, Plugin = HilbertPlugin>,
{
    type Node = N;

    fn tree(&self) -> &Rtree<P, DIM, N> {
        &self.tree
    }
}
