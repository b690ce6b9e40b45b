//! Point type for positions in physical or continuous-index space.

use nalgebra::Point as NaPoint;
use serde::{Deserialize, Serialize};
use super::Vector;

/// A position in D-dimensional space.
///
/// The same type is used for physical points (millimetres) and for
/// continuous voxel indices; which one a value holds is given by the
/// function that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<const D: usize>(pub NaPoint<f64, D>);

impl<const D: usize> Point<D> {
    /// Create a point from its coordinates.
    pub fn new(coords: [f64; D]) -> Self {
        Self(NaPoint::from(coords))
    }

    /// The point with all coordinates zero.
    pub fn origin() -> Self {
        Self(NaPoint::origin())
    }

    /// Coordinates as a fixed-size array.
    pub fn to_array(&self) -> [f64; D] {
        let mut out = [0.0; D];
        for (i, c) in out.iter_mut().enumerate() {
            *c = self.0.coords[i];
        }
        out
    }

    /// Position vector of this point relative to the origin.
    pub fn coords(&self) -> Vector<D> {
        Vector(self.0.coords)
    }

    /// Point halfway between `self` and `other`.
    pub fn midpoint(&self, other: &Self) -> Self {
        Self(NaPoint::from((self.0.coords + other.0.coords) * 0.5))
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Self) -> f64 {
        (self.0.coords - other.0.coords).norm()
    }

    /// True if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.0.coords.iter().all(|c| c.is_finite())
    }

    pub fn inner(&self) -> &NaPoint<f64, D> {
        &self.0
    }
}

impl<const D: usize> std::ops::Index<usize> for Point<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0.coords[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Point<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0.coords[index]
    }
}

impl<const D: usize> std::ops::Sub for Point<D> {
    type Output = Vector<D>;

    fn sub(self, other: Self) -> Self::Output {
        Vector(self.0.coords - other.0.coords)
    }
}

impl<const D: usize> std::ops::Add<Vector<D>> for Point<D> {
    type Output = Self;

    fn add(self, vector: Vector<D>) -> Self::Output {
        Self(self.0 + vector.0)
    }
}

impl<const D: usize> std::ops::Sub<Vector<D>> for Point<D> {
    type Output = Self;

    fn sub(self, vector: Vector<D>) -> Self::Output {
        Self(self.0 - vector.0)
    }
}

impl<const D: usize> From<[f64; D]> for Point<D> {
    fn from(coords: [f64; D]) -> Self {
        Self::new(coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Point3 = Point<3>;
    type Vector3 = Vector<3>;

    #[test]
    fn test_point_arithmetic() {
        let p = Point3::new([1.0, 2.0, 3.0]);
        let q = Point3::new([4.0, 6.0, 3.0]);
        assert_eq!(q - p, Vector3::new([3.0, 4.0, 0.0]));
        assert_eq!(p + Vector3::new([1.0, 1.0, 1.0]), Point3::new([2.0, 3.0, 4.0]));
        assert_eq!(q - Vector3::new([4.0, 6.0, 3.0]), Point3::origin());
    }

    #[test]
    fn test_midpoint_and_distance() {
        let p = Point3::new([0.0, 0.0, 0.0]);
        let q = Point3::new([2.0, 4.0, 4.0]);
        assert_eq!(p.midpoint(&q), Point3::new([1.0, 2.0, 2.0]));
        assert!((p.distance(&q) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_is_finite() {
        assert!(Point3::new([1.0, 2.0, 3.0]).is_finite());
        assert!(!Point3::new([f64::NAN, 2.0, 3.0]).is_finite());
    }
}
