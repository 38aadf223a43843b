// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! R-tree decorator rebuilding a finished tree in another node layout
//!
//! Lets the node layout be benchmarked independently of the build policy:
//! the wrapped tree is built as usual, and `prepare` copies its structure
//! bottom-up into a parallel tree of differently laid-out nodes. Searches run
//! against the rebuilt tree only.

use crate::error::IndexError;
use crate::index::SpatialIndex;
use crate::object::{DataObject, RangeQuery, Results};
use crate::stats::StatsCollector;
use crate::tree::entry::{Entry, Link, NoPlugin};
use crate::tree::node::IndexNode;
use crate::tree::rtree::{Rtree, TreeAccess};
use crate::FP;
use tracing::info;

#[derive(Debug)]
pub struct TransformingRtree<P, const DIM: usize, T, N2>
where
    P: FP,
    T: SpatialIndex<P, DIM> + TreeAccess<P, DIM>,
    N2: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    inner: T,
    rebuilt: Option<Rtree<P, DIM, N2>>,
}

impl<P, const DIM: usize, T, N2> TransformingRtree<P, DIM, T, N2>
where
    P: FP,
    T: SpatialIndex<P, DIM> + TreeAccess<P, DIM>,
    N2: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    pub fn new(inner: T) -> TransformingRtree<P, DIM, T, N2> {
        TransformingRtree {
            inner,
            rebuilt: None,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Copy one subtree into the rebuilt tree, returning the link that
    /// stands in for the subtree's entry link
    fn transform(
        source: &Rtree<P, DIM, T::Node>,
        entry: &Entry<P, DIM, <T::Node as IndexNode<P, DIM>>::Plugin>,
        height: usize,
        target: &mut Rtree<P, DIM, N2>,
    ) -> Link {
        // object ids carry over as-is
        if height < 2 {
            return entry.link;
        }

        let node = source.node(entry.link.node_ref());
        let reference = target.allocate();

        for child in node.entries() {
            let link = Self::transform(source, &child, height - 1, target);
            target
                .node_mut(reference)
                .push(Entry::new(child.mbr, link, NoPlugin));
        }

        Link::node(reference)
    }
}

impl<P, const DIM: usize, T, N2> SpatialIndex<P, DIM> for TransformingRtree<P, DIM, T, N2>
where
    P: FP,
    T: SpatialIndex<P, DIM> + TreeAccess<P, DIM>,
    N2: IndexNode<P, DIM, Plugin = NoPlugin>,
{
    fn insert(&mut self, object: DataObject<P, DIM>) {
        self.inner.insert(object);
    }

    /// Construct the rebuilt tree. Must run after the final insert and
    /// before the first search.
    fn prepare(&mut self) {
        let source = self.inner.tree();
        let mut target = Rtree::new();

        if source.height() > 0 {
            let root_link = Self::transform(source, source.root(), source.height(), &mut target);
            let root = Entry::new(source.root().mbr, root_link, NoPlugin);
            target.install_root(root, source.height());
        }

        info!(
            nodes = target.node_count(),
            height = target.height(),
            "rebuilt tree in the target layout"
        );
        self.rebuilt = Some(target);
    }

    fn search(&self, query: &RangeQuery<P, DIM>, results: &mut Results) {
        let rebuilt = self
            .rebuilt
            .as_ref()
            .expect("prepare() must run before searching a transforming R-tree");
        rebuilt.range_search(query.mbr(), results);
    }

    fn search_with_stats(
        &self,
        query: &RangeQuery<P, DIM>,
        results: &mut Results,
        stats: &mut StatsCollector,
    ) {
        let rebuilt = self
            .rebuilt
            .as_ref()
            .expect("prepare() must run before searching a transforming R-tree");
        rebuilt.range_search_with_stats(query.mbr(), results, stats);
    }

    /// The wrapped tree's statistics plus the rebuilt node count
    fn collect_statistics(&self) -> StatsCollector {
        let mut stats = self.inner.collect_statistics();
        stats.set(
            "transformed_nodes",
            self.rebuilt.as_ref().map_or(0, |tree| tree.node_count()) as u64,
        );
        stats
    }

    /// Reports the wrapped tree's structural errors
    fn check_structure(&self) -> Result<(), IndexError> {
        self.inner.check_structure()
    }
}
