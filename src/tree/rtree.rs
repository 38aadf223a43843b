// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The tree skeleton shared by every R-tree variant
//!
//! Owns the root entry, the height, and the node arena. The height counts the
//! root entry as level 1:
//!  - height 0: the tree is empty
//!  - height 1: the root entry holds a data object
//!  - height 2: the root entry points to a node of data objects
//!
//! Disk pages are not a concern; the node layout and scan strategy are
//! entirely defined by the node type.

use crate::error::IndexError;
use crate::geometry::Mbr;
use crate::object::Results;
use crate::stats::StatsCollector;
use crate::tree::arena::{NodeArena, NodeRef};
use crate::tree::entry::{Entry, EntryPlugin, Link};
use crate::tree::node::IndexNode;
use crate::FP;

/// Read access to a variant's underlying tree, used by the transforming
/// decorator to rebuild the node structure in another layout.
pub trait TreeAccess<P: FP, const DIM: usize> {
    type Node: IndexNode<P, DIM>;

    fn tree(&self) -> &Rtree<P, DIM, Self::Node>;
}

/// Position of an entry: the root lives in the tree itself, every other
/// entry in a slot of its parent node. Insert paths hold these instead of
/// references so arena growth cannot invalidate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryPos {
    Root,
    Slot(NodeRef, usize),
}

#[derive(Debug)]
pub struct Rtree<P, const DIM: usize, N>
where
    P: FP,
    N: IndexNode<P, DIM>,
{
    arena: NodeArena<N>,
    root: Entry<P, DIM, N::Plugin>,
    height: usize,
}

impl<P, const DIM: usize, N> Rtree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM>,
{
    pub fn new() -> Rtree<P, DIM, N> {
        Rtree {
            arena: NodeArena::new(),
            root: Entry::default(),
            height: 0,
        }
    }

    /// New tree with arena capacity for roughly `expected` objects
    pub fn with_expected(expected: usize) -> Rtree<P, DIM, N> {
        Rtree {
            arena: NodeArena::with_capacity(expected / N::CAPACITY.max(1) + 1),
            root: Entry::default(),
            height: 0,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    pub fn root(&self) -> &Entry<P, DIM, N::Plugin> {
        &self.root
    }

    pub fn node(&self, reference: NodeRef) -> &N {
        self.arena.get(reference)
    }

    pub fn node_mut(&mut self, reference: NodeRef) -> &mut N {
        self.arena.get_mut(reference)
    }

    /// Number of allocated nodes
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Replace the root and increment the height. The sole way the height
    /// of a tree grows.
    pub fn add_level(&mut self, new_root: Entry<P, DIM, N::Plugin>) {
        self.root = new_root;
        self.height += 1;
    }

    /// Install a root entry at the given height. Used when this tree is
    /// rebuilt wholesale from another one.
    pub(crate) fn install_root(&mut self, root: Entry<P, DIM, N::Plugin>, height: usize) {
        self.root = root;
        self.height = height;
    }

    pub(crate) fn entry_at(&self, pos: EntryPos) -> Entry<P, DIM, N::Plugin> {
        match pos {
            EntryPos::Root => self.root,
            EntryPos::Slot(node, slot) => self.node(node).entry(slot),
        }
    }

    pub(crate) fn set_entry_at(&mut self, pos: EntryPos, entry: Entry<P, DIM, N::Plugin>) {
        match pos {
            EntryPos::Root => self.root = entry,
            EntryPos::Slot(node, slot) => self.node_mut(node).set_entry(slot, entry),
        }
    }

    /// Allocate an empty node
    pub(crate) fn allocate(&mut self) -> NodeRef {
        self.arena.allocate(N::new())
    }

    /// Allocate a node holding the given entries and build its handle entry
    pub(crate) fn node_from_entries<I>(&mut self, entries: I) -> (NodeRef, Entry<P, DIM, N::Plugin>)
    where
        I: IntoIterator<Item = Entry<P, DIM, N::Plugin>>,
    {
        let reference = self.allocate();
        self.node_mut(reference).assign(entries);
        (reference, self.entry_of_node(reference))
    }

    /// Recompute the handle entry of a node from its children
    pub(crate) fn entry_of_node(&self, reference: NodeRef) -> Entry<P, DIM, N::Plugin> {
        let node = self.node(reference);
        debug_assert!(!node.is_empty());

        let mut mbr = Mbr::inverted();
        let mut plugin = N::Plugin::default();
        for child in node.entries() {
            mbr += child.mbr;
            plugin.include(&child.plugin);
        }

        Entry::new(mbr, Link::node(reference), plugin)
    }

    /// Depth-first range search over an explicit stack of scan iterators.
    /// Matching ids are appended in depth-first, entry order.
    pub fn range_search(&self, query: &Mbr<P, DIM>, results: &mut Results) {
        if self.height == 0 {
            return;
        }

        if self.height == 1 {
            if self.root.mbr.intersects(query) {
                results.push(self.root.link.id());
            }
            return;
        }

        let mut path: Vec<N::ScanIter<'_>> = Vec::with_capacity(self.height);
        path.push(self.node(self.root.link.node_ref()).scan(query));

        while !path.is_empty() {
            let step = path.last_mut().and_then(Iterator::next);
            match step {
                None => {
                    path.pop();
                }
                Some(link) => {
                    if path.len() < self.height - 1 {
                        path.push(self.node(link.node_ref()).scan(query));
                    } else {
                        results.push(link.id());
                    }
                }
            }
        }
    }

    /// Range search that counts node and leaf accesses along the way
    pub fn range_search_with_stats(
        &self,
        query: &Mbr<P, DIM>,
        results: &mut Results,
        stats: &mut StatsCollector,
    ) {
        stats.add("node_accesses", 0);
        stats.add("leaf_accesses", 0);
        let before = results.len();

        if self.height == 0 {
            stats.set("results", 0);
            return;
        }

        if self.height == 1 {
            if self.root.mbr.intersects(query) {
                results.push(self.root.link.id());
            }
            stats.set("results", (results.len() - before) as u64);
            return;
        }

        let mut path: Vec<N::ScanIter<'_>> = Vec::with_capacity(self.height);
        path.push(self.node(self.root.link.node_ref()).scan(query));
        stats.add("node_accesses", 1);
        if self.height == 2 {
            stats.add("leaf_accesses", 1);
        }

        while !path.is_empty() {
            let step = path.last_mut().and_then(Iterator::next);
            match step {
                None => {
                    path.pop();
                }
                Some(link) => {
                    if path.len() < self.height - 1 {
                        stats.add("node_accesses", 1);
                        if path.len() + 1 == self.height - 1 {
                            stats.add("leaf_accesses", 1);
                        }
                        path.push(self.node(link.node_ref()).scan(query));
                    } else {
                        results.push(link.id());
                    }
                }
            }
        }

        stats.set("results", (results.len() - before) as u64);
    }

    /// Preorder traversal.
    ///
    /// The visitor receives each node-pointing entry together with its level
    /// (the root entry is level 1) and returns whether to descend into its
    /// children. Object entries are not visited.
    pub fn traverse<F>(&self, mut visitor: F)
    where
        F: FnMut(&Entry<P, DIM, N::Plugin>, usize) -> bool,
    {
        if self.height < 2 {
            return;
        }

        if !visitor(&self.root, 1) {
            return;
        }

        if self.height == 2 {
            return;
        }

        let mut path: Vec<(NodeRef, usize)> = vec![(self.root.link.node_ref(), 0)];

        while let Some(&(reference, index)) = path.last() {
            let node = self.node(reference);

            if index >= node.len() {
                path.pop();
                continue;
            }

            if let Some(top) = path.last_mut() {
                top.1 += 1;
            }

            let entry = node.entry(index);
            let level = path.len() + 1;

            if visitor(&entry, level) && level < self.height - 1 {
                path.push((entry.link.node_ref(), 0));
            }
        }
    }

    /// Verify the structural invariants:
    ///  - every node holds between `min_fill` and capacity entries (the root
    ///    at least 2),
    ///  - every child MBR is contained in its parent's MBR,
    ///  - every parent MBR is exactly the union of its children's MBRs.
    pub fn check_structure(&self, min_fill: usize) -> Result<(), IndexError> {
        let mut error: Option<IndexError> = None;

        self.traverse(|entry, level| {
            if error.is_some() {
                return false;
            }

            let node = self.node(entry.link.node_ref());
            let size = node.len();

            if size > N::CAPACITY {
                error = Some(IndexError::InvalidStructure {
                    reason: "too many children".into(),
                    level,
                });
                return false;
            }

            let required = if level == 1 { 2 } else { min_fill };
            if size < required {
                error = Some(IndexError::InvalidStructure {
                    reason: format!("too few children ({size} < {required})"),
                    level,
                });
                return false;
            }

            let mut union = Mbr::inverted();
            for child in node.entries() {
                if !entry.mbr.contains(&child.mbr) {
                    error = Some(IndexError::InvalidStructure {
                        reason: "child not contained within its parent".into(),
                        level,
                    });
                    return false;
                }
                union += child.mbr;
            }

            if union != entry.mbr {
                error = Some(IndexError::InvalidStructure {
                    reason: "parent MBR is not the exact union of its children".into(),
                    level,
                });
                return false;
            }

            true
        });

        match error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Count nodes and entries per level. `level_k` counts the entries at
    /// elevation `k` from the objects; the root entry itself is `level_height`.
    pub fn collect_statistics(&self) -> StatsCollector {
        let mut stats = StatsCollector::new();

        stats.set("height", self.height as u64);
        stats.set("nodes", 0);
        stats.set(format!("level_{}", self.height), 1);

        self.traverse(|entry, level| {
            let node = self.node(entry.link.node_ref());
            stats.add(format!("level_{}", self.height - level), node.len() as u64);
            stats.add("nodes", 1);
            true
        });

        stats
    }
}

impl<P, const DIM: usize, N> Default for Rtree<P, DIM, N>
where
    P: FP,
    N: IndexNode<P, DIM>,
{
    fn default() -> Self {
        Rtree::new()
    }
}
