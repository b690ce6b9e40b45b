//! Direction cosine matrices.
//!
//! Column `i` of a direction matrix is the physical-space unit vector of
//! index axis `i`. Volumes require the matrix to be orthonormal, which makes
//! the inverse mapping a transpose.

use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};
use super::Vector;

/// Tolerance used when checking orthonormality of direction cosines.
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Orientation of the index axes in physical space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Axis-aligned orientation.
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Build a direction matrix from its rows.
    pub fn from_rows(rows: [[f64; D]; D]) -> Self {
        let mut m = SMatrix::<f64, D, D>::zeros();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                m[(r, c)] = *value;
            }
        }
        Self(m)
    }

    /// `M * Mᵀ == I` within [`ORTHONORMAL_TOLERANCE`].
    pub fn is_orthonormal(&self) -> bool {
        let product = self.0 * self.0.transpose();
        let identity = SMatrix::<f64, D, D>::identity();
        (product - identity).iter().all(|v| v.abs() < ORTHONORMAL_TOLERANCE)
    }

    /// Inverse of an orthonormal matrix.
    pub fn transpose(&self) -> Self {
        Self(self.0.transpose())
    }

    /// Unit vector of index axis `axis` in physical space.
    pub fn axis(&self, axis: usize) -> Vector<D> {
        Vector(self.0.column(axis).into_owned())
    }

    pub fn inner(&self) -> &SMatrix<f64, D, D> {
        &self.0
    }
}

impl Direction<3> {
    pub fn determinant(&self) -> f64 {
        self.0.determinant()
    }

    /// Rotation by `angle` radians about the physical z axis; handy for
    /// building oblique test geometries.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]])
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}

impl<const D: usize> std::ops::Mul for Direction<D> {
    type Output = Self;

    fn mul(self, other: Self) -> Self::Output {
        Self(self.0 * other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Direction3 = Direction<3>;
    type Vector3 = Vector<3>;

    #[test]
    fn test_identity_is_orthonormal() {
        let d = Direction3::identity();
        assert!(d.is_orthonormal());
        assert!((d.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reflection_is_orthonormal() {
        let d = Direction3::from_rows([[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(d.is_orthonormal());
        assert!((d.determinant() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_shear_is_rejected() {
        let d = Direction3::from_rows([[1.0, 0.2, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(!d.is_orthonormal());
    }

    #[test]
    fn test_rotation_z_axes() {
        let d = Direction3::rotation_z(std::f64::consts::FRAC_PI_2);
        assert!(d.is_orthonormal());
        let x = d.axis(0);
        assert!((x[0]).abs() < 1e-12);
        assert!((x[1] - 1.0).abs() < 1e-12);
        let back = d.transpose() * (d * Vector3::new([1.0, 2.0, 3.0]));
        assert!((back - Vector3::new([1.0, 2.0, 3.0])).norm() < 1e-12);
    }
}
