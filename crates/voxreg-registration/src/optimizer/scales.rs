//! Parameter scales and step sizes measured as physical displacement.

use nalgebra::DVector;
use voxreg_core::image::ImageGeometry;
use voxreg_core::spatial::Point3;
use voxreg_core::transform::{RigidParameters, RigidTransform, Transform};

/// Parameter change used to measure each parameter's effect.
pub const SMALL_PARAMETER_VARIATION: f64 = 0.01;

/// Relates parameter changes to how far points move in physical space.
pub trait ShiftEstimator {
    /// Per-parameter scales: the squared physical shift produced by a unit
    /// change of each parameter.
    fn estimate_scales(&self, parameters: &DVector<f64>) -> DVector<f64>;

    /// Largest physical displacement caused by adding `step` to `parameters`,
    /// to first order.
    fn step_shift(&self, parameters: &DVector<f64>, step: &DVector<f64>) -> f64;
}

/// Measures shifts of a fixed set of reference points, by default the eight
/// corners of the fixed image, under a rigid transform.
#[derive(Debug, Clone)]
pub struct PhysicalShiftEstimator {
    transform: RigidTransform,
    reference_points: Vec<Point3>,
}

impl PhysicalShiftEstimator {
    pub fn new(transform: RigidTransform, reference_points: Vec<Point3>) -> Self {
        Self { transform, reference_points }
    }

    /// Measure at the corners of `geometry`.
    pub fn from_geometry(transform: RigidTransform, geometry: &ImageGeometry) -> Self {
        Self::new(transform, geometry.corners().to_vec())
    }

    fn at(&self, parameters: &DVector<f64>) -> RigidTransform {
        self.transform
            .with_parameters(&RigidParameters::from_iterator(parameters.iter().copied()))
    }

    fn maximum_displacement(&self, from: &RigidTransform, to: &RigidTransform) -> f64 {
        self.reference_points
            .iter()
            .map(|p| from.transform_point(p).distance(&to.transform_point(p)))
            .fold(0.0, f64::max)
    }
}

impl ShiftEstimator for PhysicalShiftEstimator {
    fn estimate_scales(&self, parameters: &DVector<f64>) -> DVector<f64> {
        let reference = self.at(parameters);
        DVector::from_fn(parameters.len(), |i, _| {
            let mut varied = parameters.clone();
            varied[i] += SMALL_PARAMETER_VARIATION;
            let shift = self.maximum_displacement(&reference, &self.at(&varied));
            let scale = (shift / SMALL_PARAMETER_VARIATION).powi(2);
            if scale > f64::EPSILON { scale } else { 1.0 }
        })
    }

    fn step_shift(&self, parameters: &DVector<f64>, step: &DVector<f64>) -> f64 {
        let transform = self.at(parameters);
        let step = RigidParameters::from_iterator(step.iter().copied());
        self.reference_points
            .iter()
            .map(|p| (transform.jacobian(p) * step).norm())
            .fold(0.0, f64::max)
    }
}
