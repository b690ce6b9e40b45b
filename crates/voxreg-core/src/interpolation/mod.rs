//! Interpolation types and operations.
//!
//! This module provides interpolation traits and implementations
//! for sampling values at continuous coordinates.

pub mod trait_;
pub mod linear;
pub mod nearest;

use serde::{Deserialize, Serialize};
use crate::image::PixelValue;
use crate::spatial::Point3;

pub use trait_::Interpolator;
pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;

/// Interpolation method selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpolationMode {
    #[default]
    NearestNeighbor,
    Linear,
}

impl Interpolator for InterpolationMode {
    #[inline]
    fn evaluate<T: PixelValue>(&self, values: &[T], size: [usize; 3], index: &Point3) -> Option<f64> {
        match self {
            InterpolationMode::NearestNeighbor => NearestNeighborInterpolator.evaluate(values, size, index),
            InterpolationMode::Linear => LinearInterpolator.evaluate(values, size, index),
        }
    }
}
