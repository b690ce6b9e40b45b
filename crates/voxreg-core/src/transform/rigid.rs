//! Rigid transform implementation.
//!
//! This module provides a rigid transform (rotation + translation) about a
//! fixed center.

use nalgebra::{Matrix3, SMatrix, SVector};
use serde::{Deserialize, Serialize};
use crate::spatial::{Point3, Vector, Vector3};
use super::trait_::Transform;

/// Optimizable parameters `[α, β, γ, tx, ty, tz]`: Euler angles in radians
/// about x, y and z, followed by the translation.
pub type RigidParameters = SVector<f64, 6>;

/// Rigid Transform (Rotation + Translation).
///
/// Euler angles use the ZYX convention, `R = Rz(γ) Ry(β) Rx(α)`, and the
/// transform applies as `T(x) = c + R(x - c) + t`. The rotation matrix is
/// rebuilt from the angles whenever they change, so it stays orthonormal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RigidTransformState", into = "RigidTransformState")]
pub struct RigidTransform {
    center: Point3,
    angles: Vector3,
    translation: Vector3,
    matrix: Matrix3<f64>,
}

#[derive(Serialize, Deserialize, Clone)]
struct RigidTransformState {
    center: Point3,
    angles: Vector3,
    translation: Vector3,
}

impl From<RigidTransformState> for RigidTransform {
    fn from(state: RigidTransformState) -> Self {
        Self::new(state.center, state.angles, state.translation)
    }
}

impl From<RigidTransform> for RigidTransformState {
    fn from(t: RigidTransform) -> Self {
        Self {
            center: t.center,
            angles: t.angles,
            translation: t.translation,
        }
    }
}

impl RigidTransform {
    /// Create a new rigid transform.
    ///
    /// # Arguments
    /// * `center` - Fixed center of rotation
    /// * `angles` - Euler angles `(α, β, γ)` in radians about x, y and z
    /// * `translation` - Translation applied after the rotation
    pub fn new(center: Point3, angles: Vector3, translation: Vector3) -> Self {
        Self {
            center,
            angles,
            translation,
            matrix: rotation_matrix(&angles),
        }
    }

    /// No rotation, no translation, rotating about `center`.
    pub fn identity(center: Point3) -> Self {
        Self::new(center, Vector3::zeros(), Vector3::zeros())
    }

    pub fn center(&self) -> &Point3 {
        &self.center
    }

    pub fn angles(&self) -> &Vector3 {
        &self.angles
    }

    pub fn translation(&self) -> &Vector3 {
        &self.translation
    }

    pub fn rotation_matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Move the center of rotation. The parameters are kept, so the mapping
    /// changes unless the rotation is zero.
    pub fn set_center(&mut self, center: Point3) {
        self.center = center;
    }

    /// Current parameter vector `[α, β, γ, tx, ty, tz]`.
    pub fn parameters(&self) -> RigidParameters {
        RigidParameters::from([
            self.angles[0],
            self.angles[1],
            self.angles[2],
            self.translation[0],
            self.translation[1],
            self.translation[2],
        ])
    }

    /// Replace all six parameters and rebuild the rotation matrix.
    pub fn set_parameters(&mut self, parameters: &RigidParameters) {
        self.angles = Vector3::new([parameters[0], parameters[1], parameters[2]]);
        self.translation = Vector3::new([parameters[3], parameters[4], parameters[5]]);
        self.matrix = rotation_matrix(&self.angles);
    }

    /// A copy with `parameters` applied.
    pub fn with_parameters(&self, parameters: &RigidParameters) -> Self {
        let mut out = self.clone();
        out.set_parameters(parameters);
        out
    }

    /// Derivative of the mapped point with respect to each parameter,
    /// evaluated at `point`. Columns follow the parameter order.
    pub fn jacobian(&self, point: &Point3) -> SMatrix<f64, 3, 6> {
        let (sa, ca) = self.angles[0].sin_cos();
        let (sb, cb) = self.angles[1].sin_cos();
        let (sg, cg) = self.angles[2].sin_cos();

        let rx = Matrix3::new(1.0, 0.0, 0.0, 0.0, ca, -sa, 0.0, sa, ca);
        let ry = Matrix3::new(cb, 0.0, sb, 0.0, 1.0, 0.0, -sb, 0.0, cb);
        let rz = Matrix3::new(cg, -sg, 0.0, sg, cg, 0.0, 0.0, 0.0, 1.0);

        let drx = Matrix3::new(0.0, 0.0, 0.0, 0.0, -sa, -ca, 0.0, ca, -sa);
        let dry = Matrix3::new(-sb, 0.0, cb, 0.0, 0.0, 0.0, -cb, 0.0, -sb);
        let drz = Matrix3::new(-sg, -cg, 0.0, cg, -sg, 0.0, 0.0, 0.0, 0.0);

        let offset = (*point - self.center).0;
        let mut jacobian = SMatrix::<f64, 3, 6>::zeros();
        jacobian.set_column(0, &(rz * ry * drx * offset));
        jacobian.set_column(1, &(rz * dry * rx * offset));
        jacobian.set_column(2, &(drz * ry * rx * offset));
        jacobian.fixed_view_mut::<3, 3>(0, 3).fill_with_identity();
        jacobian
    }
}

impl Transform for RigidTransform {
    fn transform_point(&self, point: &Point3) -> Point3 {
        let offset = (*point - self.center).0;
        self.center + Vector(self.matrix * offset) + self.translation
    }
}

/// `Rz(γ) Ry(β) Rx(α)`.
fn rotation_matrix(angles: &Vector3) -> Matrix3<f64> {
    let (sx, cx) = angles[0].sin_cos();
    let (sy, cy) = angles[1].sin_cos();
    let (sz, cz) = angles[2].sin_cos();

    Matrix3::new(
        cz * cy,
        cz * sy * sx - sz * cx,
        cz * sy * cx + sz * sx,
        sz * cy,
        sz * sy * sx + cz * cx,
        sz * sy * cx - cz * sx,
        -sy,
        cy * sx,
        cy * cx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point_near(actual: &Point3, expected: [f64; 3], tol: f64) {
        for i in 0..3 {
            assert!(
                (actual[i] - expected[i]).abs() < tol,
                "component {} mismatch: got {}, expected {}",
                i,
                actual[i],
                expected[i]
            );
        }
    }

    #[test]
    fn test_rigid_transform_translation_only() {
        let t = RigidTransform::new(
            Point3::origin(),
            Vector3::zeros(),
            Vector3::new([1.0, 2.0, 3.0]),
        );
        let p = t.transform_point(&Point3::new([1.0, 1.0, 1.0]));
        assert_point_near(&p, [2.0, 3.0, 4.0], 1e-12);
    }

    #[test]
    fn test_rigid_transform_3d_rotation_z() {
        // Rotate 90 deg around Z. Euler: x, y, z. So [0, 0, PI/2]
        let t = RigidTransform::new(
            Point3::origin(),
            Vector3::new([0.0, 0.0, std::f64::consts::FRAC_PI_2]),
            Vector3::zeros(),
        );
        let p = t.transform_point(&Point3::new([1.0, 0.0, 0.0]));
        assert_point_near(&p, [0.0, 1.0, 0.0], 1e-12);
    }

    #[test]
    fn test_rotation_about_center() {
        let c = Point3::new([10.0, 10.0, 0.0]);
        let t = RigidTransform::new(
            c,
            Vector3::new([0.0, 0.0, std::f64::consts::PI]),
            Vector3::zeros(),
        );
        assert_point_near(&t.transform_point(&c), [10.0, 10.0, 0.0], 1e-12);
        assert_point_near(&t.transform_point(&Point3::new([11.0, 10.0, 0.0])), [9.0, 10.0, 0.0], 1e-12);
    }

    #[test]
    fn test_matrix_stays_orthonormal() {
        let mut t = RigidTransform::identity(Point3::origin());
        for k in 0..100 {
            let a = 0.37 * k as f64;
            t.set_parameters(&RigidParameters::from([a, -0.5 * a, 1.3 * a, 0.0, 0.0, 0.0]));
        }
        let r = t.rotation_matrix();
        let err = (r * r.transpose() - Matrix3::identity()).abs().max();
        assert!(err < 1e-12);
        assert!((r.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_parameters_roundtrip() {
        let params = RigidParameters::from([0.1, -0.2, 0.3, 4.0, 5.0, -6.0]);
        let t = RigidTransform::identity(Point3::new([1.0, 2.0, 3.0])).with_parameters(&params);
        assert_eq!(t.parameters(), params);
    }

    #[test]
    fn test_jacobian_matches_finite_differences() {
        let params = RigidParameters::from([0.2, -0.1, 0.4, 1.0, -2.0, 0.5]);
        let t = RigidTransform::identity(Point3::new([3.0, -1.0, 2.0])).with_parameters(&params);
        let x = Point3::new([7.0, 4.0, -3.0]);
        let jac = t.jacobian(&x);

        let h = 1e-6;
        for k in 0..6 {
            let mut plus = params;
            let mut minus = params;
            plus[k] += h;
            minus[k] -= h;
            let fp = t.with_parameters(&plus).transform_point(&x);
            let fm = t.with_parameters(&minus).transform_point(&x);
            for row in 0..3 {
                let numeric = (fp[row] - fm[row]) / (2.0 * h);
                assert!(
                    (numeric - jac[(row, k)]).abs() < 1e-6,
                    "d{}/dp{}: analytic {}, numeric {}",
                    row,
                    k,
                    jac[(row, k)],
                    numeric
                );
            }
        }
    }
}
