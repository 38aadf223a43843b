// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Indexed objects and queries

use crate::geometry::Mbr;
use crate::FP;
use std::fmt;

/// Opaque object identifier. `0` is reserved for "uninitialized".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub fn is_initialized(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An identified axis-aligned box to be stored in an index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataObject<P, const DIM: usize> {
    pub id: ObjectId,
    pub mbr: Mbr<P, DIM>,
}

impl<P: FP, const DIM: usize> DataObject<P, DIM> {
    pub fn new(id: ObjectId, mbr: Mbr<P, DIM>) -> DataObject<P, DIM> {
        debug_assert!(id.is_initialized(), "object id 0 is reserved");
        DataObject { id, mbr }
    }
}

/// A range query: everything whose MBR intersects the query box matches
#[derive(Debug, Clone, Copy)]
pub struct RangeQuery<P, const DIM: usize> {
    mbr: Mbr<P, DIM>,
}

impl<P: FP, const DIM: usize> RangeQuery<P, DIM> {
    pub fn new(mbr: Mbr<P, DIM>) -> RangeQuery<P, DIM> {
        RangeQuery { mbr }
    }

    pub fn mbr(&self) -> &Mbr<P, DIM> {
        &self.mbr
    }
}

/// Ids of matching objects, in depth-first entry order.
/// The order is tree-state dependent; only the set is part of the contract.
pub type Results = Vec<ObjectId>;
