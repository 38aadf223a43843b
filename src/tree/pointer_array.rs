// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Node layout with MBRs and links in separate arrays
//!
//! Keeping the MBRs contiguous lets the scan walk MBR storage only, never
//! touching link storage for entries that do not match.

use crate::geometry::Mbr;
use crate::tree::entry::{Entry, EntryPlugin, Link, NoPlugin};
use crate::tree::node::IndexNode;
use crate::FP;

#[derive(Debug)]
pub struct PointerArrayNode<P, const DIM: usize, const C: usize, PL: EntryPlugin = NoPlugin> {
    mbrs: [Mbr<P, DIM>; C],
    links: [Link; C],
    plugins: [PL; C],
    len: usize,
    data: PL::NodeData,
}

impl<P: FP, const DIM: usize, const C: usize, PL: EntryPlugin> IndexNode<P, DIM>
    for PointerArrayNode<P, DIM, C, PL>
{
    type Plugin = PL;
    type ScanIter<'a>
        = PointerArrayScanIter<'a, P, DIM, C, PL>
    where
        Self: 'a;

    const CAPACITY: usize = C;

    fn new() -> Self {
        PointerArrayNode {
            mbrs: [Mbr::inverted(); C],
            links: [Link::default(); C],
            plugins: [PL::default(); C],
            len: 0,
            data: Default::default(),
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn entry(&self, index: usize) -> Entry<P, DIM, PL> {
        debug_assert!(index < self.len);
        Entry::new(self.mbrs[index], self.links[index], self.plugins[index])
    }

    fn set_entry(&mut self, index: usize, entry: Entry<P, DIM, PL>) {
        debug_assert!(index < self.len);
        self.mbrs[index] = entry.mbr;
        self.links[index] = entry.link;
        self.plugins[index] = entry.plugin;
    }

    fn push(&mut self, entry: Entry<P, DIM, PL>) {
        assert!(self.len < C, "trying to add an entry to a full node");
        self.mbrs[self.len] = entry.mbr;
        self.links[self.len] = entry.link;
        self.plugins[self.len] = entry.plugin;
        self.len += 1;
    }

    fn reset(&mut self) {
        self.len = 0;
    }

    fn scan<'a>(&'a self, query: &'a Mbr<P, DIM>) -> Self::ScanIter<'a> {
        PointerArrayScanIter {
            node: self,
            query,
            index: 0,
        }
    }

    fn data(&self) -> PL::NodeData {
        self.data
    }

    fn set_data(&mut self, data: PL::NodeData) {
        self.data = data;
    }
}

/// Scan that reads link storage only for matching entries
#[derive(Debug)]
pub struct PointerArrayScanIter<'a, P, const DIM: usize, const C: usize, PL: EntryPlugin> {
    node: &'a PointerArrayNode<P, DIM, C, PL>,
    query: &'a Mbr<P, DIM>,
    index: usize,
}

impl<'a, P: FP, const DIM: usize, const C: usize, PL: EntryPlugin> Iterator
    for PointerArrayScanIter<'a, P, DIM, C, PL>
{
    type Item = Link;

    fn next(&mut self) -> Option<Link> {
        while self.index < self.node.len {
            let index = self.index;
            self.index += 1;

            if self.node.mbrs[index].intersects(self.query) {
                return Some(self.node.links[index]);
            }
        }
        None
    }
}
