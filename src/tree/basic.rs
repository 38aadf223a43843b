// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The insert skeleton shared by the strategy-driven variants
//!
//! Inserts dig down the tree using the policy's `choose_subtree`, then split
//! nodes upwards as necessary, distributing entries between the two halves
//! with the policy's `redistribute`.

use crate::object::DataObject;
use crate::tree::arena::NodeRef;
use crate::tree::entry::Entry;
use crate::tree::node::IndexNode;
use crate::tree::rtree::{EntryPos, Rtree};
use crate::FP;
use tracing::debug;

/// What distinguishes the strategy-driven R-tree variants: how a subtree is
/// chosen during descent and how entries are redistributed on a split.
pub(crate) trait SplitPolicy<P: FP, const DIM: usize, N: IndexNode<P, DIM>> {
    /// Slot of the child of `node` best suited to receive `entry`
    fn choose_subtree(
        &self,
        tree: &Rtree<P, DIM, N>,
        node: NodeRef,
        entry: &Entry<P, DIM, N::Plugin>,
    ) -> usize;

    /// Redistribute the pooled children of `a` and `b` between the two.
    /// `level` counts upwards from the leaf nodes (0 = leaf level).
    fn redistribute(
        &mut self,
        tree: &mut Rtree<P, DIM, N>,
        a: &mut Entry<P, DIM, N::Plugin>,
        b: &mut Entry<P, DIM, N::Plugin>,
        level: usize,
    );
}

/// Insert one object, splitting bottom-up as necessary
pub(crate) fn insert_object<P, const DIM: usize, N, S>(
    tree: &mut Rtree<P, DIM, N>,
    policy: &mut S,
    object: &DataObject<P, DIM>,
) where
    P: FP,
    N: IndexNode<P, DIM>,
    S: SplitPolicy<P, DIM, N>,
{
    let mut entry = Entry::object(object);

    // No nodes yet: the object becomes the root
    if tree.height() == 0 {
        tree.add_level(entry);
        return;
    }

    // Single object: build a two-child root
    if tree.height() == 1 {
        let old_root = *tree.root();
        let (_, root_entry) = tree.node_from_entries([old_root, entry]);
        tree.add_level(root_entry);
        return;
    }

    // Dig down to the leaf node, enlarging the entries on the way
    let mut path = vec![EntryPos::Root];

    while path.len() < tree.height() - 1 {
        let top = *path.last().unwrap();
        let mut parent = tree.entry_at(top);
        parent.include(&entry);
        tree.set_entry_at(top, parent);

        let node = parent.link.node_ref();
        let slot = policy.choose_subtree(tree, node, &entry);
        path.push(EntryPos::Slot(node, slot));
    }

    // Split bottom-up as long as necessary
    let mut level = 0;
    let mut index = path.len();

    while index > 0 {
        let pos = path[index - 1];
        let target = tree.entry_at(pos);
        let node = target.link.node_ref();

        if !tree.node(node).is_full() {
            tree.node_mut(node).push(entry);
            let mut updated = tree.entry_at(pos);
            updated.include(&entry);
            tree.set_entry_at(pos, updated);
            return;
        }

        debug!(level, "splitting full node");
        let (_, mut sibling) = tree.node_from_entries([entry]);
        let mut original = target;
        policy.redistribute(tree, &mut original, &mut sibling, level);
        tree.set_entry_at(pos, original);

        entry = sibling;
        level += 1;
        index -= 1;
    }

    // The root node itself split
    debug!("splitting the root");
    let old_root = *tree.root();
    let (_, new_root) = tree.node_from_entries([old_root, entry]);
    tree.add_level(new_root);
}
