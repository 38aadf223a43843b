// Copyright 2024 mbrtree Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Geometric primitives: points and minimum bounding rectangles

use crate::FP;
use itertools::izip;
use num::{One, Zero};
use std::convert::{AsMut, AsRef};
use std::ops::{Add, AddAssign, Deref, DerefMut};

/// An n-dimensional point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<P, const DIM: usize> {
    pub coords: [P; DIM],
}

impl<P: FP, const DIM: usize> Point<P, DIM> {
    /// New Point from a coordinate array
    pub fn new(coords: [P; DIM]) -> Point<P, DIM> {
        for coord in &coords {
            assert!(coord.is_finite(), "{:?} should be finite", coord);
        }
        Point { coords }
    }

    /// New Point from a slice
    pub fn from_slice(slice: &[P]) -> Point<P, DIM> {
        let mut coords = [P::default(); DIM];
        coords.copy_from_slice(slice);
        Point::new(coords)
    }

    /// Squared euclidean distance to another point
    pub fn distance2(&self, other: &Point<P, DIM>) -> P {
        izip!(&self.coords, &other.coords).fold(Zero::zero(), |dist, (&x, &y)| {
            dist + (x - y) * (x - y)
        })
    }
}

impl<P: FP, const DIM: usize> Deref for Point<P, DIM> {
    type Target = [P];

    fn deref(&self) -> &[P] {
        &self.coords
    }
}

impl<P: FP, const DIM: usize> DerefMut for Point<P, DIM> {
    fn deref_mut(&mut self) -> &mut [P] {
        &mut self.coords
    }
}

impl<P: FP, const DIM: usize> AsRef<[P]> for Point<P, DIM> {
    fn as_ref(&self) -> &[P] {
        self.deref()
    }
}

impl<P: FP, const DIM: usize> AsMut<[P]> for Point<P, DIM> {
    fn as_mut(&mut self) -> &mut [P] {
        self.deref_mut()
    }
}

/// How the extent of an MBR is measured when evaluating overlap and
/// enlargement costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Volume,
    Perimeter,
}

impl Measure {
    pub fn eval<P: FP, const DIM: usize>(self, mbr: &Mbr<P, DIM>) -> P {
        match self {
            Measure::Volume => mbr.volume(),
            Measure::Perimeter => mbr.perimeter(),
        }
    }
}

/// Minimum bounding rectangle with a fixed dimension.
///
/// Edges are closed: two MBRs touching along an edge or at a corner count as
/// intersecting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mbr<P, const DIM: usize> {
    low: [P; DIM],
    high: [P; DIM],
}

impl<P: FP, const DIM: usize> Mbr<P, DIM> {
    /// New MBR from its two corners. Every coordinate must be finite and
    /// `low[i] <= high[i]` must hold for every axis.
    pub fn new(low: [P; DIM], high: [P; DIM]) -> Mbr<P, DIM> {
        for (&x, &y) in izip!(&low, &high) {
            assert!(x.is_finite(), "{:?} should be finite", x);
            assert!(y.is_finite(), "{:?} should be finite", y);
            assert!(x <= y, "low {:?} must not dominate high {:?}", x, y);
        }
        Mbr { low, high }
    }

    /// MBR of a single point. The result has no volume.
    pub fn from_point(point: Point<P, DIM>) -> Mbr<P, DIM> {
        Mbr {
            low: point.coords,
            high: point.coords,
        }
    }

    /// The inverted MBR whose corners are at (MAX, MIN) on every axis.
    /// Unioning anything into it yields that thing; simplifies folds.
    pub fn inverted() -> Mbr<P, DIM> {
        Mbr {
            low: [P::max_value(); DIM],
            high: [P::min_value(); DIM],
        }
    }

    /// Low corner
    pub fn low(&self) -> &[P; DIM] {
        &self.low
    }

    /// High corner
    pub fn high(&self) -> &[P; DIM] {
        &self.high
    }

    /// Hypervolume
    pub fn volume(&self) -> P {
        izip!(&self.low, &self.high).fold(One::one(), |v, (&x, &y)| v * (y - x))
    }

    /// Sum of the extents along each axis, as defined by Beckmann and Seeger.
    /// Generalizes to any dimension and skips a useless constant factor.
    pub fn perimeter(&self) -> P {
        izip!(&self.low, &self.high).fold(Zero::zero(), |p, (&x, &y)| p + y - x)
    }

    /// Center point
    pub fn center(&self) -> Point<P, DIM> {
        let two = P::one() + P::one();
        let mut coords = [P::default(); DIM];
        for (c, &x, &y) in izip!(&mut coords, &self.low, &self.high) {
            *c = (x + y) / two;
        }
        Point { coords }
    }

    /// Volume enlargement necessary to include the given MBR
    pub fn enlargement(&self, other: &Mbr<P, DIM>) -> P {
        (*self + *other).volume() - self.volume()
    }

    /// The growth of `measure` when `other` is unioned into this MBR
    pub fn delta(&self, measure: Measure, other: &Mbr<P, DIM>) -> P {
        measure.eval(&(*self + *other)) - measure.eval(self)
    }

    /// Dead volume created by covering this and `other` with one MBR
    pub fn waste(&self, other: &Mbr<P, DIM>) -> P {
        (*self + *other).volume() - self.volume() - other.volume()
    }

    /// Whether this MBR intersects another. Edges are closed.
    pub fn intersects(&self, other: &Mbr<P, DIM>) -> bool {
        izip!(&self.low, &self.high, &other.low, &other.high)
            .all(|(&low, &high, &olow, &ohigh)| high >= olow && ohigh >= low)
    }

    /// MBR of the intersection between this and another MBR.
    /// Only defined when the two intersect.
    pub fn intersection(&self, other: &Mbr<P, DIM>) -> Mbr<P, DIM> {
        debug_assert!(self.intersects(other));
        let mut result = *self;
        for (low, high, &olow, &ohigh) in
            izip!(&mut result.low, &mut result.high, &other.low, &other.high)
        {
            *low = low.max(olow);
            *high = high.min(ohigh);
        }
        result
    }

    /// Whether `other` is completely contained in this MBR
    pub fn contains(&self, other: &Mbr<P, DIM>) -> bool {
        izip!(&self.low, &self.high, &other.low, &other.high)
            .all(|(&low, &high, &olow, &ohigh)| low <= olow && ohigh <= high)
    }

    /// The measured overlap with another MBR, 0 when disjoint
    pub fn overlap(&self, measure: Measure, other: &Mbr<P, DIM>) -> P {
        if self.intersects(other) {
            measure.eval(&self.intersection(other))
        } else {
            Zero::zero()
        }
    }

    /// Distance to another MBR along a single axis, 0 when they overlap there
    pub fn distance_along(&self, axis: usize, other: &Mbr<P, DIM>) -> P {
        (self.low[axis] - other.high[axis])
            .max(other.low[axis] - self.high[axis])
            .max(Zero::zero())
    }

    /// Squared distance between two MBRs
    pub fn distance2(&self, other: &Mbr<P, DIM>) -> P {
        (0..DIM).fold(Zero::zero(), |dist, axis| {
            let diff = self.distance_along(axis, other);
            dist + diff * diff
        })
    }

    /// The increase of the overlap between this MBR and `other` if `extra`
    /// were unioned into this MBR.
    ///
    /// Zero when the enlarged MBR stays clear of `other`; the pre-existing
    /// overlap is subtracted when this already intersected `other`.
    pub fn overlap_enlargement(&self, other: &Mbr<P, DIM>, extra: &Mbr<P, DIM>, measure: Measure) -> P {
        let enlarged = *self + *extra;

        if !enlarged.intersects(other) {
            return Zero::zero();
        }

        let mut overlap = measure.eval(&enlarged.intersection(other));

        if self.intersects(other) {
            overlap = overlap - measure.eval(&self.intersection(other));
        }

        overlap
    }
}

/// Adding two MBRs gives the MBR covering both.
impl<P: FP, const DIM: usize> Add for Mbr<P, DIM> {
    type Output = Mbr<P, DIM>;

    fn add(mut self, other: Mbr<P, DIM>) -> Mbr<P, DIM> {
        for (low, high, &olow, &ohigh) in
            izip!(&mut self.low, &mut self.high, &other.low, &other.high)
        {
            *low = low.min(olow);
            *high = high.max(ohigh);
        }
        self
    }
}

impl<P: FP, const DIM: usize> AddAssign for Mbr<P, DIM> {
    fn add_assign(&mut self, other: Mbr<P, DIM>) {
        *self = *self + other;
    }
}

impl<P: FP, const DIM: usize> Default for Mbr<P, DIM> {
    fn default() -> Mbr<P, DIM> {
        Mbr::inverted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mbr2(low: [f64; 2], high: [f64; 2]) -> Mbr<f64, 2> {
        Mbr::new(low, high)
    }

    #[test]
    fn point_point_distance() {
        let a = Mbr::from_point(Point::new([0.0f64, 0.0]));
        let b = Mbr::from_point(Point::new([0.0f64, 1.0]));

        assert_relative_eq!(a.distance2(&b), 1.0);
        assert_relative_eq!(b.distance2(&a), 1.0);
        assert_relative_eq!(a.distance2(&a), 0.0);
    }

    #[test]
    fn point_box_distance() {
        let a = mbr2([1.0, -1.0], [2.0, 1.0]);
        let b = Mbr::from_point(Point::new([0.0f64, 0.0]));
        let c = Mbr::from_point(Point::new([1.5f64, 0.0]));

        assert_relative_eq!(a.distance2(&b), 1.0);
        assert_relative_eq!(a.distance2(&c), 0.0);
    }

    #[test]
    fn box_box_distance() {
        let a = mbr2([-1.0, 0.0], [0.0, 1.0]);
        let b = mbr2([1.0, -3.0], [2.0, -2.0]);
        let c = mbr2([-0.5, 0.5], [5.0, 0.8]);

        assert_relative_eq!(a.distance2(&b), 5.0);
        assert_relative_eq!(a.distance2(&c), 0.0);
        assert_relative_eq!(b.distance2(&c), 2.5 * 2.5);
    }

    #[test]
    fn intersects() {
        let a = mbr2([1.0, 2.0], [3.0, 4.0]);
        let b = mbr2([2.0, 1.0], [4.0, 3.0]);
        let c = mbr2([10.0, 10.0], [11.0, 11.0]);
        let d = mbr2([3.0, 4.0], [5.0, 5.0]);

        assert!(a.intersects(&b));
        assert_eq!(a.intersects(&b), b.intersects(&a));
        assert_eq!(c.intersects(&a), a.intersects(&c));
        assert!(!a.intersects(&c));
        // closed edges: touching at a corner counts
        assert!(a.intersects(&d));
        assert!(a.intersects(&a));
    }

    #[test]
    fn intersection() {
        let a = mbr2([1.0, 2.0], [3.0, 4.0]);
        let b = mbr2([2.0, 1.0], [4.0, 3.0]);

        assert_relative_eq!(a.intersection(&b).volume(), 1.0);
        assert_relative_eq!(a.intersection(&a).volume(), a.volume());
    }

    #[test]
    fn perimeter() {
        assert_relative_eq!(mbr2([1.0, 2.0], [3.0, 4.0]).perimeter(), 4.0);
        assert_relative_eq!(mbr2([0.0, 0.0], [1.0, 0.0]).perimeter(), 1.0);
        assert_relative_eq!(mbr2([0.0, 0.0], [0.0, 0.0]).perimeter(), 0.0);
        assert_relative_eq!(
            Mbr::new([-1.0f64, -1.0, -1.0], [1.0, 1.0, 1.0]).perimeter(),
            6.0
        );
    }

    #[test]
    fn center() {
        let center = mbr2([1.0, 2.0], [3.0, 4.0]).center();
        assert_relative_eq!(center[0], 2.0);
        assert_relative_eq!(center[1], 3.0);
    }

    #[test]
    fn waste() {
        let a = mbr2([1.0, 3.0], [3.0, 5.0]);
        let b = mbr2([9.0, 1.0], [10.0, 2.0]);
        let c = mbr2([3.0, 3.0], [5.0, 5.0]);

        assert_relative_eq!(a.waste(&b), 31.0);
        assert_relative_eq!(a.waste(&b), b.waste(&a));
        assert_relative_eq!(a.waste(&a), -4.0);
        assert_relative_eq!(a.waste(&c), 0.0);
        assert_relative_eq!(c.waste(&b), 23.0);
    }

    #[test]
    fn delta() {
        let a = mbr2([1.0, 1.0], [3.0, 3.0]);
        let b = mbr2([4.0, 1.0], [5.0, 2.0]);

        assert_relative_eq!(a.delta(Measure::Volume, &b), 4.0);
        assert_relative_eq!(b.delta(Measure::Volume, &a), 7.0);
        assert_relative_eq!(b.delta(Measure::Volume, &b), 0.0);
        assert_relative_eq!(a.delta(Measure::Volume, &a), 0.0);
    }

    #[test]
    fn overlap_enlargement() {
        let a = mbr2([0.0, 0.0], [2.0, 3.0]);
        let b = mbr2([3.0, 1.0], [5.0, 3.0]);
        let c = mbr2([3.0, 1.0], [4.0, 2.0]);

        // initially not overlapping
        assert_relative_eq!(a.overlap_enlargement(&b, &c, Measure::Volume), 2.0);
        assert_relative_eq!(a.overlap_enlargement(&b, &c, Measure::Perimeter), 3.0);

        // overlap of a with itself does not grow
        assert_relative_eq!(a.overlap_enlargement(&a, &c, Measure::Volume), 0.0);

        // the other way around
        assert_relative_eq!(a.overlap_enlargement(&c, &b, Measure::Volume), 1.0);

        // already overlapping: pre-existing overlap is subtracted
        assert_relative_eq!((a + c).overlap_enlargement(&b, &b, Measure::Volume), 2.0);

        // no change in size
        assert_relative_eq!(b.overlap_enlargement(&a, &c, Measure::Volume), 0.0);
        assert_relative_eq!(b.overlap_enlargement(&a, &c, Measure::Perimeter), 0.0);
    }

    #[test]
    #[should_panic(expected = "must not dominate")]
    fn low_must_not_dominate_high() {
        let _ = mbr2([1.0, 0.0], [0.0, 1.0]);
    }
}
