// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Entries, links and entry plugins

use crate::geometry::Mbr;
use crate::object::{DataObject, ObjectId};
use crate::tree::arena::NodeRef;
use crate::FP;
use std::fmt::Debug;

/// An outbound link from a node: either a child node or an object id.
///
/// The discriminant is implied by the depth in the tree (links at the leaf
/// level carry object ids, links above carry node references), so release
/// builds store the raw word only; debug builds keep the tag and assert every
/// access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    raw: u64,
    #[cfg(debug_assertions)]
    is_id: bool,
}

impl Link {
    /// Link to a data object
    pub fn object(id: ObjectId) -> Link {
        Link {
            raw: id.0,
            #[cfg(debug_assertions)]
            is_id: true,
        }
    }

    /// Link to a child node
    pub fn node(node: NodeRef) -> Link {
        Link {
            raw: u64::from(node.0),
            #[cfg(debug_assertions)]
            is_id: false,
        }
    }

    /// The object id stored in this link
    pub fn id(self) -> ObjectId {
        #[cfg(debug_assertions)]
        debug_assert!(self.is_id, "link does not hold an object id");
        ObjectId(self.raw)
    }

    /// The node referenced by this link
    pub fn node_ref(self) -> NodeRef {
        #[cfg(debug_assertions)]
        debug_assert!(!self.is_id, "link does not hold a node reference");
        NodeRef(self.raw as u32)
    }
}

impl Default for Link {
    fn default() -> Link {
        Link::object(ObjectId(0))
    }
}

/// Per-entry auxiliary state attached to every entry of a node.
///
/// A parent entry accumulates its plugin by folding in the plugins of its
/// node's children; plugins may additionally capture node-level bookkeeping
/// whenever a node's entries are (re)assigned.
pub trait EntryPlugin: Copy + Default + Debug {
    /// Bookkeeping stored in the node itself
    type NodeData: Copy + Default + Debug;

    /// Fold a child entry's plugin state into this (parent) plugin
    fn include(&mut self, _child: &Self) {}

    /// Node state captured when a node's entries are (re)assigned
    fn capture(_len: usize) -> Self::NodeData {
        Default::default()
    }
}

/// The do-nothing plugin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoPlugin;

impl EntryPlugin for NoPlugin {
    type NodeData = ();
}

/// Plugin for the revised R*-tree: remembers how many of a node's first
/// entries defined its MBR at assignment time. Later insertions may enlarge
/// the node, but the captured original is what the split weighting uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapturedCenterPlugin;

impl EntryPlugin for CapturedCenterPlugin {
    type NodeData = u32;

    fn capture(len: usize) -> u32 {
        len as u32
    }
}

/// Plugin for the Hilbert R-tree: the largest Hilbert value among the
/// subtree's objects (for an object entry, the value of its MBR center).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HilbertPlugin {
    pub value: u64,
}

impl EntryPlugin for HilbertPlugin {
    type NodeData = ();

    fn include(&mut self, child: &Self) {
        self.value = self.value.max(child.value);
    }
}

/// The handle by which a parent refers to a child: the child's MBR, the link
/// to it, and the plugin state. The root of a tree is itself an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry<P, const DIM: usize, PL> {
    pub mbr: Mbr<P, DIM>,
    pub link: Link,
    pub plugin: PL,
}

impl<P: FP, const DIM: usize, PL: EntryPlugin> Entry<P, DIM, PL> {
    pub fn new(mbr: Mbr<P, DIM>, link: Link, plugin: PL) -> Entry<P, DIM, PL> {
        Entry { mbr, link, plugin }
    }

    /// Entry for a data object, with a default-initialized plugin
    pub fn object(object: &DataObject<P, DIM>) -> Entry<P, DIM, PL> {
        Entry {
            mbr: object.mbr,
            link: Link::object(object.id),
            plugin: PL::default(),
        }
    }

    /// Update this entry to cover the given one somewhere below in the
    /// hierarchy: union the MBR and fold the plugin.
    pub fn include(&mut self, other: &Entry<P, DIM, PL>) {
        self.mbr += other.mbr;
        self.plugin.include(&other.plugin);
    }
}

impl<P: FP, const DIM: usize, PL: EntryPlugin> Default for Entry<P, DIM, PL> {
    fn default() -> Entry<P, DIM, PL> {
        Entry {
            mbr: Mbr::inverted(),
            link: Link::default(),
            plugin: PL::default(),
        }
    }
}
