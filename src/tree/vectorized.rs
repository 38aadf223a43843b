// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Column-major node layout amenable to vectorized scans
//!
//! Coordinates are stored in blocks of four 64-bit lanes per dimension: for
//! each block of four entries and each dimension, one low strip and one high
//! strip, 32-byte aligned. The scan compares a broadcast query coordinate
//! against a whole strip at a time and ANDs the resulting 4-bit masks across
//! dimensions, so a block costs one comparison per strip instead of one per
//! entry. Requires 64-bit coordinates.

use crate::geometry::Mbr;
use crate::tree::entry::{Entry, EntryPlugin, Link, NoPlugin};
use crate::tree::node::IndexNode;

/// Lanes per coordinate strip
const LANES: usize = 4;

/// One aligned strip of four coordinates
#[repr(align(32))]
#[derive(Debug, Clone, Copy)]
struct Strip([f64; LANES]);

#[derive(Debug)]
pub struct VectorizedNode<const DIM: usize, const C: usize, PL: EntryPlugin = NoPlugin> {
    /// `n_blocks * 2 * DIM` strips, block-major; within a block the low and
    /// high strips of each dimension alternate
    coords: Vec<Strip>,
    links: [Link; C],
    plugins: [PL; C],
    len: usize,
    data: PL::NodeData,
}

impl<const DIM: usize, const C: usize, PL: EntryPlugin> VectorizedNode<DIM, C, PL> {
    /// Number of four-entry blocks
    pub const N_BLOCKS: usize = (C + LANES - 1) / LANES;

    fn strip_base(block: usize) -> usize {
        block * 2 * DIM
    }

    /// 4-bit mask of the block's entries intersecting the query
    fn scan_block(&self, block: usize, query: &Mbr<f64, DIM>) -> u8 {
        let base = Self::strip_base(block);
        let mut mask: u8 = (1 << LANES) - 1;

        for d in 0..DIM {
            if mask == 0 {
                break;
            }

            let query_low = query.low()[d];
            let query_high = query.high()[d];
            let lows = &self.coords[base + 2 * d].0;
            let highs = &self.coords[base + 2 * d + 1].0;

            let mut strip_mask: u8 = 0;
            for lane in 0..LANES {
                let hit = highs[lane] >= query_low && query_high >= lows[lane];
                strip_mask |= (hit as u8) << lane;
            }

            mask &= strip_mask;
        }

        mask
    }
}

impl<const DIM: usize, const C: usize, PL: EntryPlugin> IndexNode<f64, DIM>
    for VectorizedNode<DIM, C, PL>
{
    type Plugin = PL;
    type ScanIter<'a>
        = VectorizedScanIter<'a, DIM, C, PL>
    where
        Self: 'a;

    const CAPACITY: usize = C;

    fn new() -> Self {
        VectorizedNode {
            coords: vec![Strip([0.0; LANES]); Self::N_BLOCKS * 2 * DIM],
            links: [Link::default(); C],
            plugins: [PL::default(); C],
            len: 0,
            data: Default::default(),
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn entry(&self, index: usize) -> Entry<f64, DIM, PL> {
        debug_assert!(index < self.len);
        let base = Self::strip_base(index / LANES);
        let lane = index % LANES;

        let mut low = [0.0; DIM];
        let mut high = [0.0; DIM];
        for d in 0..DIM {
            low[d] = self.coords[base + 2 * d].0[lane];
            high[d] = self.coords[base + 2 * d + 1].0[lane];
        }

        Entry::new(Mbr::new(low, high), self.links[index], self.plugins[index])
    }

    fn set_entry(&mut self, index: usize, entry: Entry<f64, DIM, PL>) {
        debug_assert!(index < self.len);
        let base = Self::strip_base(index / LANES);
        let lane = index % LANES;

        for d in 0..DIM {
            self.coords[base + 2 * d].0[lane] = entry.mbr.low()[d];
            self.coords[base + 2 * d + 1].0[lane] = entry.mbr.high()[d];
        }
        self.links[index] = entry.link;
        self.plugins[index] = entry.plugin;
    }

    fn push(&mut self, entry: Entry<f64, DIM, PL>) {
        assert!(self.len < C, "trying to add an entry to a full node");
        self.len += 1;
        self.set_entry(self.len - 1, entry);
    }

    fn reset(&mut self) {
        self.len = 0;
    }

    fn scan<'a>(&'a self, query: &'a Mbr<f64, DIM>) -> Self::ScanIter<'a> {
        let mask = if self.len > 0 {
            self.scan_block(0, query)
        } else {
            0
        };

        VectorizedScanIter {
            node: self,
            query,
            index: 0,
            mask,
        }
    }

    fn data(&self) -> PL::NodeData {
        self.data
    }

    fn set_data(&mut self, data: PL::NodeData) {
        self.data = data;
    }
}

/// Pass over the block masks yielding one link per set bit
#[derive(Debug)]
pub struct VectorizedScanIter<'a, const DIM: usize, const C: usize, PL: EntryPlugin> {
    node: &'a VectorizedNode<DIM, C, PL>,
    query: &'a Mbr<f64, DIM>,
    index: usize,
    mask: u8,
}

impl<'a, const DIM: usize, const C: usize, PL: EntryPlugin> VectorizedScanIter<'a, DIM, C, PL> {
    fn step(&mut self) {
        self.mask >>= 1;
        self.index += 1;

        if self.index % LANES == 0 && self.index < self.node.len {
            self.mask = self.node.scan_block(self.index / LANES, self.query);
        }
    }
}

impl<'a, const DIM: usize, const C: usize, PL: EntryPlugin> Iterator
    for VectorizedScanIter<'a, DIM, C, PL>
{
    type Item = Link;

    fn next(&mut self) -> Option<Link> {
        while self.index < self.node.len {
            if self.mask & 1 != 0 {
                let link = self.node.links[self.index];
                self.step();
                return Some(link);
            }
            self.step();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectId;
    use crate::tree::node::testutil::{check_retainment, check_scan};

    type N = VectorizedNode<2, 100>;

    #[test]
    fn data_retainment() {
        check_retainment::<N>();
    }

    #[test]
    fn scan_matches_brute_force() {
        check_scan::<N>();
    }

    #[test]
    fn strips_are_aligned() {
        assert_eq!(std::mem::align_of::<Strip>(), 32);
        let node = N::new();
        assert_eq!(node.coords.as_ptr() as usize % 32, 0);
    }

    #[test]
    fn scan_visits_one_strip_pair_per_block_and_dimension() {
        // Sixteen entries spread along the first axis, capacity 16: exactly
        // ceil(16 / 4) = 4 blocks
        type Small = VectorizedNode<2, 16>;
        assert_eq!(Small::N_BLOCKS, 4);

        let mut node = Small::new();
        for i in 0..16u64 {
            let x = i as f64;
            node.push(Entry::new(
                Mbr::new([x, 0.0], [x, 0.0]),
                Link::object(ObjectId(i + 1)),
                NoPlugin,
            ));
        }

        let query = Mbr::new([4.0, 0.0], [7.0, 0.0]);
        let ids: Vec<u64> = node.scan(&query).map(|link| link.id().0).collect();
        assert_eq!(ids, vec![5, 6, 7, 8]);
    }

    #[test]
    fn stale_lanes_beyond_len_are_ignored() {
        type Small = VectorizedNode<2, 16>;
        let mut node = Small::new();
        // Two entries in the first block; the remaining zeroed lanes would
        // match a query around the origin if they leaked out
        node.push(Entry::new(
            Mbr::new([5.0, 5.0], [6.0, 6.0]),
            Link::object(ObjectId(1)),
            NoPlugin,
        ));
        node.push(Entry::new(
            Mbr::new([-1.0, -1.0], [1.0, 1.0]),
            Link::object(ObjectId(2)),
            NoPlugin,
        ));

        let query = Mbr::new([-0.5, -0.5], [0.5, 0.5]);
        let ids: Vec<u64> = node.scan(&query).map(|link| link.id().0).collect();
        assert_eq!(ids, vec![2]);
    }
}
