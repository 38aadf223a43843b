// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The naive node layout: an array of entry structs

use crate::geometry::Mbr;
use crate::tree::entry::{Entry, EntryPlugin, Link, NoPlugin};
use crate::tree::node::IndexNode;
use crate::FP;

/// Node where the fields of each entry are stored together.
#[derive(Debug)]
pub struct DefaultNode<P, const DIM: usize, const C: usize, PL: EntryPlugin = NoPlugin> {
    entries: [Entry<P, DIM, PL>; C],
    len: usize,
    data: PL::NodeData,
}

impl<P: FP, const DIM: usize, const C: usize, PL: EntryPlugin> IndexNode<P, DIM>
    for DefaultNode<P, DIM, C, PL>
{
    type Plugin = PL;
    type ScanIter<'a>
        = DefaultScanIter<'a, P, DIM, C, PL>
    where
        Self: 'a;

    const CAPACITY: usize = C;

    fn new() -> Self {
        DefaultNode {
            entries: [Entry::default(); C],
            len: 0,
            data: Default::default(),
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn entry(&self, index: usize) -> Entry<P, DIM, PL> {
        debug_assert!(index < self.len);
        self.entries[index]
    }

    fn set_entry(&mut self, index: usize, entry: Entry<P, DIM, PL>) {
        debug_assert!(index < self.len);
        self.entries[index] = entry;
    }

    fn push(&mut self, entry: Entry<P, DIM, PL>) {
        assert!(self.len < C, "trying to add an entry to a full node");
        self.entries[self.len] = entry;
        self.len += 1;
    }

    fn reset(&mut self) {
        self.len = 0;
    }

    fn scan<'a>(&'a self, query: &'a Mbr<P, DIM>) -> Self::ScanIter<'a> {
        DefaultScanIter {
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

/// Iterator over the links of entries matching a query
#[derive(Debug)]
pub struct DefaultScanIter<'a, P, const DIM: usize, const C: usize, PL: EntryPlugin> {
    node: &'a DefaultNode<P, DIM, C, PL>,
    query: &'a Mbr<P, DIM>,
    index: usize,
}

impl<'a, P: FP, const DIM: usize, const C: usize, PL: EntryPlugin> Iterator
    for DefaultScanIter<'a, P, DIM, C, PL>
{
    type Item = Link;

    fn next(&mut self) -> Option<Link> {
        while self.index < self.node.len {
            let entry = &self.node.entries[self.index];
            self.index += 1;

            if entry.mbr.intersects(self.query) {
                return Some(entry.link);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectId;
    use crate::tree::node::testutil::{check_retainment, check_scan};

    type N = DefaultNode<f64, 2, 100>;

    #[test]
    fn data_retainment() {
        check_retainment::<N>();
    }

    #[test]
    fn scan_matches_brute_force() {
        check_scan::<N>();
    }

    #[test]
    fn scan_is_in_entry_order() {
        let mut node = N::new();
        for i in 0..10u64 {
            let x = i as f64;
            node.push(Entry::new(
                Mbr::new([x, 0.0], [x + 2.0, 1.0]),
                Link::object(ObjectId(i + 1)),
                NoPlugin,
            ));
        }

        let query = Mbr::new([3.0, 0.0], [5.0, 1.0]);
        let ids: Vec<u64> = node.scan(&query).map(|link| link.id().0).collect();
        assert_eq!(ids, vec![2, 3, 4, 5, 6]);
    }
}
