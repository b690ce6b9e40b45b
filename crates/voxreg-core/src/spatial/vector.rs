//! Vector type for displacements, and the `Spacing` alias built on it.

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// A displacement or direction in D-dimensional space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector<const D: usize>(pub SVector<f64, D>);

/// Physical distance between adjacent voxel centres along each index axis.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Vector<D> {
    pub fn new(components: [f64; D]) -> Self {
        Self(SVector::from(components))
    }

    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    /// Every component set to `value`.
    pub fn uniform(value: f64) -> Self {
        Self(SVector::repeat(value))
    }

    pub fn to_array(&self) -> [f64; D] {
        let mut out = [0.0; D];
        for (i, c) in out.iter_mut().enumerate() {
            *c = self.0[i];
        }
        out
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        self.0.norm()
    }

    /// Component-wise product, used to scale an index offset by spacing.
    pub fn component_mul(&self, other: &Self) -> Self {
        Self(self.0.component_mul(&other.0))
    }

    /// Component-wise quotient.
    pub fn component_div(&self, other: &Self) -> Self {
        Self(self.0.component_div(&other.0))
    }

    pub fn min_component(&self) -> f64 {
        self.0.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_component(&self) -> f64 {
        self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn inner(&self) -> &SVector<f64, D> {
        &self.0
    }
}

impl<const D: usize> std::ops::Index<usize> for Vector<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Vector<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Add for Vector<D> {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self(self.0 + other.0)
    }
}

impl<const D: usize> std::ops::Sub for Vector<D> {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self(self.0 - other.0)
    }
}

impl<const D: usize> std::ops::Mul<f64> for Vector<D> {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self(self.0 * scalar)
    }
}

impl<const D: usize> std::ops::Neg for Vector<D> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl<const D: usize> From<[f64; D]> for Vector<D> {
    fn from(components: [f64; D]) -> Self {
        Self::new(components)
    }
}
