// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Insert-then-query round trips against a brute-force reference, across
//! every index variant and node layout

use mbrtree::{
    CapturedCenterPlugin, DataObject, DefaultNode, GreeneRtree, HilbertPlugin, HilbertRtree, Mbr,
    ObjectId, PointerArrayNode, QuadraticRtree, RRStarTree, RStarTree, RangeQuery, Results,
    SpatialIndex, TransformingRtree, VectorizedNode,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_objects<const DIM: usize>(
    rng: &mut StdRng,
    count: usize,
    extent: f64,
) -> Vec<DataObject<f64, DIM>> {
    (0..count)
        .map(|i| {
            let mut low = [0.0; DIM];
            let mut high = [0.0; DIM];
            for d in 0..DIM {
                low[d] = rng.gen_range(0.0..extent);
                high[d] = low[d] + rng.gen_range(0.0..extent / 20.0);
            }
            DataObject::new(ObjectId(i as u64 + 1), Mbr::new(low, high))
        })
        .collect()
}

fn random_query<const DIM: usize>(rng: &mut StdRng, extent: f64) -> Mbr<f64, DIM> {
    let mut low = [0.0; DIM];
    let mut high = [0.0; DIM];
    for d in 0..DIM {
        low[d] = rng.gen_range(0.0..extent);
        high[d] = low[d] + rng.gen_range(0.0..extent / 4.0);
    }
    Mbr::new(low, high)
}

fn brute_force<const DIM: usize>(
    objects: &[DataObject<f64, DIM>],
    query: &Mbr<f64, DIM>,
) -> Vec<ObjectId> {
    let mut ids: Vec<ObjectId> = objects
        .iter()
        .filter(|object| object.mbr.intersects(query))
        .map(|object| object.id)
        .collect();
    ids.sort();
    ids
}

/// Build the index from the objects, then compare a batch of random range
/// queries against the brute-force answer
fn check_roundtrip<const DIM: usize, I: SpatialIndex<f64, DIM>>(
    mut index: I,
    seed: u64,
    count: usize,
) {
    let extent = 100.0;
    let mut rng = StdRng::seed_from_u64(seed);
    let objects = random_objects::<DIM>(&mut rng, count, extent);

    for object in &objects {
        index.insert(*object);
        index.check_structure().unwrap();
    }
    index.prepare();
    index.check_structure().unwrap();

    for _ in 0..50 {
        let query = random_query::<DIM>(&mut rng, extent);
        let mut results = Results::new();
        index.search(&RangeQuery::new(query), &mut results);
        results.sort();

        assert_eq!(results, brute_force(&objects, &query));
    }
}

#[test]
fn quadratic_roundtrip() {
    check_roundtrip::<2, _>(
        QuadraticRtree::<f64, 2, DefaultNode<f64, 2, 8>>::new(3),
        42,
        250,
    );
}

#[test]
fn quadratic_on_pointer_array_nodes() {
    check_roundtrip::<2, _>(
        QuadraticRtree::<f64, 2, PointerArrayNode<f64, 2, 8>>::new(3),
        43,
        250,
    );
}

#[test]
fn quadratic_on_vectorized_nodes() {
    check_roundtrip::<2, _>(
        QuadraticRtree::<f64, 2, VectorizedNode<2, 8>>::new(3),
        44,
        250,
    );
}

#[test]
fn greene_roundtrip() {
    check_roundtrip::<2, _>(GreeneRtree::<f64, 2, DefaultNode<f64, 2, 8>>::new(2), 45, 250);
}

#[test]
fn rstar_roundtrip() {
    check_roundtrip::<2, _>(
        RStarTree::<f64, 2, DefaultNode<f64, 2, 8>>::with_reinsert_count(2, 3),
        46,
        250,
    );
}

#[test]
fn rrstar_roundtrip() {
    check_roundtrip::<2, _>(
        RRStarTree::<f64, 2, DefaultNode<f64, 2, 8, CapturedCenterPlugin>>::new(2),
        47,
        250,
    );
}

#[test]
fn hilbert_roundtrip() {
    let bounds = Mbr::new([0.0, 0.0], [110.0, 110.0]);
    check_roundtrip::<2, _>(
        HilbertRtree::<f64, 2, DefaultNode<f64, 2, 8, HilbertPlugin>>::new(&bounds, 2),
        48,
        250,
    );
}

#[test]
fn transformed_to_pointer_array() {
    check_roundtrip::<2, _>(
        TransformingRtree::<_, 2, _, PointerArrayNode<f64, 2, 8>>::new(QuadraticRtree::<
            f64,
            2,
            DefaultNode<f64, 2, 8>,
        >::new(3)),
        49,
        250,
    );
}

#[test]
fn transformed_to_vectorized() {
    check_roundtrip::<2, _>(
        TransformingRtree::<_, 2, _, VectorizedNode<2, 8>>::new(RStarTree::<
            f64,
            2,
            DefaultNode<f64, 2, 8>,
        >::new(2)),
        50,
        250,
    );
}

#[test]
fn five_dimensional_roundtrip() {
    check_roundtrip::<5, _>(
        QuadraticRtree::<f64, 5, DefaultNode<f64, 5, 16>>::new(4),
        51,
        200,
    );
    check_roundtrip::<5, _>(
        RStarTree::<f64, 5, DefaultNode<f64, 5, 16>>::new(4),
        52,
        200,
    );
}

#[test]
fn single_precision_roundtrip() {
    let mut index = QuadraticRtree::<f32, 2, DefaultNode<f32, 2, 8>>::new(3);
    let mut rng = StdRng::seed_from_u64(53);

    let objects: Vec<DataObject<f32, 2>> = (0..200)
        .map(|i| {
            let x: f32 = rng.gen_range(0.0..100.0);
            let y: f32 = rng.gen_range(0.0..100.0);
            DataObject::new(
                ObjectId(i as u64 + 1),
                Mbr::new([x, y], [x + 1.0, y + 1.0]),
            )
        })
        .collect();

    for object in &objects {
        index.insert(*object);
    }
    index.check_structure().unwrap();

    for _ in 0..50 {
        let x: f32 = rng.gen_range(0.0..100.0);
        let y: f32 = rng.gen_range(0.0..100.0);
        let query = Mbr::new([x, y], [x + 20.0, y + 20.0]);

        let mut results = Results::new();
        index.search(&RangeQuery::new(query), &mut results);
        results.sort();

        let mut expected: Vec<ObjectId> = objects
            .iter()
            .filter(|object| object.mbr.intersects(&query))
            .map(|object| object.id)
            .collect();
        expected.sort();
        assert_eq!(results, expected);
    }
}

#[test]
fn instrumented_search_counts_accesses() {
    let mut index = QuadraticRtree::<f64, 2, DefaultNode<f64, 2, 8>>::new(3);
    let mut rng = StdRng::seed_from_u64(54);
    let objects = random_objects::<2>(&mut rng, 150, 100.0);

    for object in &objects {
        index.insert(*object);
    }

    let query = random_query::<2>(&mut rng, 100.0);
    let mut results = Results::new();
    let mut stats = mbrtree::StatsCollector::new();
    index.search_with_stats(&RangeQuery::new(query), &mut results, &mut stats);

    assert_eq!(stats.get("results"), Some(results.len() as u64));
    assert!(stats.get("node_accesses").unwrap() >= 1);
    assert!(stats.get("leaf_accesses").unwrap() <= stats.get("node_accesses").unwrap());
}

/// The set of results must agree across all variants for identical input
#[test]
fn variants_agree_on_the_result_set() {
    let mut rng = StdRng::seed_from_u64(55);
    let objects = random_objects::<2>(&mut rng, 300, 100.0);
    let bounds = Mbr::new([0.0, 0.0], [110.0, 110.0]);

    let mut quadratic = QuadraticRtree::<f64, 2, DefaultNode<f64, 2, 8>>::new(3);
    let mut greene = GreeneRtree::<f64, 2, DefaultNode<f64, 2, 8>>::new(2);
    let mut rstar = RStarTree::<f64, 2, DefaultNode<f64, 2, 8>>::new(2);
    let mut rrstar = RRStarTree::<f64, 2, DefaultNode<f64, 2, 8, CapturedCenterPlugin>>::new(2);
    let mut hilbert =
        HilbertRtree::<f64, 2, DefaultNode<f64, 2, 8, HilbertPlugin>>::new(&bounds, 2);

    for object in &objects {
        quadratic.insert(*object);
        greene.insert(*object);
        rstar.insert(*object);
        rrstar.insert(*object);
        hilbert.insert(*object);
    }

    for _ in 0..25 {
        let query = random_query::<2>(&mut rng, 100.0);
        let expected = brute_force(&objects, &query);

        let collect = |index: &dyn SpatialIndex<f64, 2>| {
            let mut results = Results::new();
            index.search(&RangeQuery::new(query), &mut results);
            results.sort();
            results
        };

        assert_eq!(collect(&quadratic), expected);
        assert_eq!(collect(&greene), expected);
        assert_eq!(collect(&rstar), expected);
        assert_eq!(collect(&rrstar), expected);
        assert_eq!(collect(&hilbert), expected);
    }
}
