// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Property-based round trips: for any data set and any query box, every
//! variant returns exactly the brute-force answer, and the structural
//! invariants hold after every insert

use mbrtree::{
    CapturedCenterPlugin, DataObject, DefaultNode, GreeneRtree, HilbertPlugin, HilbertRtree, Mbr,
    ObjectId, QuadraticRtree, RRStarTree, RStarTree, RangeQuery, Results, SpatialIndex,
};
use proptest::collection::vec;
use proptest::prelude::*;

const EXTENT: f64 = 64.0;

fn arb_box() -> impl Strategy<Value = Mbr<f64, 2>> {
    (
        0.0..EXTENT,
        0.0..EXTENT,
        0.0..EXTENT / 8.0,
        0.0..EXTENT / 8.0,
    )
        .prop_map(|(x, y, w, h)| Mbr::new([x, y], [x + w, y + h]))
}

fn objects_from(boxes: Vec<Mbr<f64, 2>>) -> Vec<DataObject<f64, 2>> {
    boxes
        .into_iter()
        .enumerate()
        .map(|(i, mbr)| DataObject::new(ObjectId(i as u64 + 1), mbr))
        .collect()
}

fn expected(objects: &[DataObject<f64, 2>], query: &Mbr<f64, 2>) -> Vec<ObjectId> {
    let mut ids: Vec<ObjectId> = objects
        .iter()
        .filter(|object| object.mbr.intersects(query))
        .map(|object| object.id)
        .collect();
    ids.sort();
    ids
}

fn search_sorted<I: SpatialIndex<f64, 2>>(index: &I, query: &Mbr<f64, 2>) -> Vec<ObjectId> {
    let mut results = Results::new();
    index.search(&RangeQuery::new(*query), &mut results);
    results.sort();
    results
}

proptest! {
    #[test]
    fn quadratic_returns_the_exact_set(
        boxes in vec(arb_box(), 1..48),
        query in arb_box(),
    ) {
        let objects = objects_from(boxes);
        let mut index = QuadraticRtree::<f64, 2, DefaultNode<f64, 2, 4>>::new(2);
        for object in &objects {
            index.insert(*object);
            prop_assert!(index.check_structure().is_ok());
        }
        prop_assert_eq!(search_sorted(&index, &query), expected(&objects, &query));
    }

    #[test]
    fn greene_returns_the_exact_set(
        boxes in vec(arb_box(), 1..48),
        query in arb_box(),
    ) {
        let objects = objects_from(boxes);
        let mut index = GreeneRtree::<f64, 2, DefaultNode<f64, 2, 5>>::new(2);
        for object in &objects {
            index.insert(*object);
            prop_assert!(index.check_structure().is_ok());
        }
        prop_assert_eq!(search_sorted(&index, &query), expected(&objects, &query));
    }

    #[test]
    fn rstar_returns_the_exact_set(
        boxes in vec(arb_box(), 1..48),
        query in arb_box(),
    ) {
        let objects = objects_from(boxes);
        let mut index = RStarTree::<f64, 2, DefaultNode<f64, 2, 6>>::with_reinsert_count(2, 2);
        for object in &objects {
            index.insert(*object);
            prop_assert!(index.check_structure().is_ok());
        }
        prop_assert_eq!(search_sorted(&index, &query), expected(&objects, &query));
    }

    #[test]
    fn rrstar_returns_the_exact_set(
        boxes in vec(arb_box(), 1..48),
        query in arb_box(),
    ) {
        let objects = objects_from(boxes);
        let mut index =
            RRStarTree::<f64, 2, DefaultNode<f64, 2, 4, CapturedCenterPlugin>>::new(1);
        for object in &objects {
            index.insert(*object);
            prop_assert!(index.check_structure().is_ok());
        }
        prop_assert_eq!(search_sorted(&index, &query), expected(&objects, &query));
    }

    #[test]
    fn hilbert_returns_the_exact_set(
        boxes in vec(arb_box(), 1..48),
        query in arb_box(),
    ) {
        let objects = objects_from(boxes);
        let bounds = Mbr::new([0.0, 0.0], [EXTENT + EXTENT / 8.0, EXTENT + EXTENT / 8.0]);
        let mut index =
            HilbertRtree::<f64, 2, DefaultNode<f64, 2, 4, HilbertPlugin>>::new(&bounds, 2);
        for object in &objects {
            index.insert(*object);
            prop_assert!(index.check_structure().is_ok());
        }
        prop_assert_eq!(search_sorted(&index, &query), expected(&objects, &query));
    }
}
