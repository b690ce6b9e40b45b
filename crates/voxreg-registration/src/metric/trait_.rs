//! Metric trait for image similarity measurement.

use voxreg_core::transform::{RigidParameters, RigidTransform};
use crate::error::Result;
use super::sampler::SampleSet;

/// Value and parameter gradient of a metric at one transform.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricEvaluation {
    /// Cost to minimize.
    pub value: f64,
    /// Derivative of `value` with respect to `[α, β, γ, tx, ty, tz]`.
    pub gradient: RigidParameters,
    /// Samples that mapped inside the moving image.
    pub valid_samples: usize,
}

/// Metric trait for measuring similarity between images.
///
/// Metrics compute a cost that represents the dissimilarity between a
/// fixed (reference) image and a moving image seen through a transform.
/// Lower values indicate better alignment.
pub trait Metric: Send + Sync {
    /// Evaluate the cost and its gradient over `samples`, mapping fixed
    /// points into the moving image with `transform`.
    fn evaluate(&self, transform: &RigidTransform, samples: &SampleSet) -> Result<MetricEvaluation>;

    /// Get the name of this metric.
    fn name(&self) -> &'static str;
}
