// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A family of n-dimensional in-memory R-tree spatial indexes.
//!
//! The crate answers range queries — "return every stored object whose
//! bounding box intersects a query box" — over axis-aligned rectangles of
//! low-to-moderate dimension. Construction policy (Guttman quadratic, Greene,
//! R*, revised R*, Hilbert) and node layout (entry structs, split MBR/link
//! arrays, column-major 4-lane blocks) vary independently; every variant
//! exposes the same [`SpatialIndex`] interface.

pub mod geometry;
pub mod hilbert;
pub mod tree;

mod error;
mod index;
mod object;
mod stats;

use num::traits::float::FloatCore;
use num::{FromPrimitive, ToPrimitive};
use std::fmt::Debug;
use std::ops::{AddAssign, MulAssign};

pub use crate::error::IndexError;
pub use crate::geometry::{Mbr, Measure, Point};
pub use crate::index::SpatialIndex;
pub use crate::object::{DataObject, ObjectId, RangeQuery, Results};
pub use crate::stats::StatsCollector;
pub use crate::tree::{
    CapturedCenterPlugin, DefaultNode, Entry, EntryPlugin, GreeneRtree, HilbertPlugin,
    HilbertRtree, IndexNode, Link, NoPlugin, NodeArena, NodeRef, PointerArrayNode, QuadraticRtree,
    RRStarTree, RStarTree, Rtree, TransformingRtree, TreeAccess, VectorizedNode,
};

/// The scalar trait every coordinate type must satisfy.
///
/// Satisfied by `f32` and `f64` through the blanket impl below.
pub trait FP:
    FloatCore + MulAssign + AddAssign + ToPrimitive + FromPrimitive + Copy + Debug + Default
{
}

impl<P> FP for P where
    P: FloatCore + MulAssign + AddAssign + ToPrimitive + FromPrimitive + Copy + Debug + Default
{
}
