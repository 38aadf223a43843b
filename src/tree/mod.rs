// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The R-tree family: node layouts, the tree skeleton, and the insert
//! strategies that distinguish the variants

mod arena;
mod basic;
mod default_node;
mod entry;
mod greene;
mod hilbert_tree;
mod node;
mod pointer_array;
mod quadratic;
mod rrstar;
mod rstar;
mod rtree;
mod transform;
mod vectorized;

pub use self::arena::{NodeArena, NodeRef};
pub use self::default_node::DefaultNode;
pub use self::entry::{CapturedCenterPlugin, Entry, EntryPlugin, HilbertPlugin, Link, NoPlugin};
pub use self::greene::GreeneRtree;
pub use self::hilbert_tree::HilbertRtree;
pub use self::node::{EntryIter, IndexNode};
pub use self::pointer_array::PointerArrayNode;
pub use self::quadratic::QuadraticRtree;
pub use self::rrstar::RRStarTree;
pub use self::rstar::RStarTree;
pub use self::rtree::{Rtree, TreeAccess};
pub use self::transform::TransformingRtree;
pub use self::vectorized::VectorizedNode;
