//! Interpolator trait for sampling values at continuous coordinates.

use crate::image::{PixelValue, Volume};
use crate::spatial::Point3;
use crate::with_volume_data;

/// Samples a voxel buffer at a continuous index.
///
/// Interpolators are used to sample image values at non-integer coordinates,
/// which is essential for image registration and resampling. They return
/// `None` when the index falls outside the buffer so that callers decide
/// how out-of-bounds samples are handled.
pub trait Interpolator: Send + Sync {
    /// Interpolate `values` (row-major `[z, y, x]`, `size` in `(x, y, z)`)
    /// at continuous index `index`.
    fn evaluate<T: PixelValue>(&self, values: &[T], size: [usize; 3], index: &Point3) -> Option<f64>;

    /// Interpolate a volume of any pixel type.
    fn evaluate_volume(&self, volume: &Volume, index: &Point3) -> Option<f64> {
        let size = volume.size();
        with_volume_data!(volume.data(), v => self.evaluate(v, size, index))
    }
}

#[inline]
pub(crate) fn offset(size: [usize; 3], x: usize, y: usize, z: usize) -> usize {
    (z * size[1] + y) * size[0] + x
}
