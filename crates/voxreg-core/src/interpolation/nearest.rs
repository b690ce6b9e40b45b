//! Nearest neighbor interpolation implementation.

use crate::image::PixelValue;
use crate::spatial::Point3;
use super::trait_::{offset, Interpolator};

/// Nearest Neighbor Interpolator.
///
/// Rounds each coordinate to the closest integer (halves round up) and
/// reads that voxel. A rounded index outside `[0, size - 1]` on any axis
/// yields `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborInterpolator;

impl NearestNeighborInterpolator {
    /// Create a new nearest neighbor interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl Interpolator for NearestNeighborInterpolator {
    #[inline]
    fn evaluate<T: PixelValue>(&self, values: &[T], size: [usize; 3], index: &Point3) -> Option<f64> {
        let mut rounded = [0usize; 3];
        for axis in 0..3 {
            let r = (index[axis] + 0.5).floor();
            if !(r >= 0.0 && r <= (size[axis] - 1) as f64) {
                return None;
            }
            rounded[axis] = r as usize;
        }
        values
            .get(offset(size, rounded[0], rounded[1], rounded[2]))
            .map(|v| v.to_f64())
    }
}
