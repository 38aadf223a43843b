// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The common interface to all spatial indexes

use crate::error::IndexError;
use crate::geometry::Point;
use crate::object::{DataObject, RangeQuery, Results};
use crate::stats::StatsCollector;
use crate::FP;

/// The interface shared by every index in this crate.
///
/// Objects are inserted one by one; [`prepare`](SpatialIndex::prepare) must be
/// called after the final insert and before the first search, allowing an
/// index to digest the data in whatever way seems reasonable (a no-op for the
/// R-tree variants, the rebuild step for the transforming decorator).
pub trait SpatialIndex<P: FP, const DIM: usize> {
    /// Insert a data object into this index
    fn insert(&mut self, object: DataObject<P, DIM>);

    /// Prepare the index for searching
    fn prepare(&mut self) {}

    /// Append the ids of all objects matching the query to `results`
    fn search(&self, query: &RangeQuery<P, DIM>, results: &mut Results);

    /// Like [`search`](SpatialIndex::search), but counts node and leaf
    /// accesses into `stats` along the way
    fn search_with_stats(
        &self,
        query: &RangeQuery<P, DIM>,
        results: &mut Results,
        stats: &mut StatsCollector,
    ) {
        self.search(query, results);
        stats.set("results", results.len() as u64);
    }

    /// k-nearest-neighbour search. Not implemented by the R-tree family.
    fn knn_search(
        &self,
        _k: usize,
        _point: &Point<P, DIM>,
        _results: &mut Results,
    ) -> Result<(), IndexError> {
        Err(IndexError::Unsupported("k-NN search"))
    }

    /// Counters describing the index structure
    fn collect_statistics(&self) -> StatsCollector;

    /// Verify the structural invariants, reporting the first violation
    fn check_structure(&self) -> Result<(), IndexError>;
}
