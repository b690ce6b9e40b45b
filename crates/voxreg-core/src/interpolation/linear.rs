//! Linear interpolation implementation.

use crate::image::PixelValue;
use crate::spatial::Point3;
use super::trait_::{offset, Interpolator};

/// Slack allowed outside the grid before an index counts as outside.
pub const INDEX_TOLERANCE: f64 = 1e-6;

/// Linear Interpolator.
///
/// Performs trilinear interpolation inside `[0, size - 1]` on every axis.
/// Indices within [`INDEX_TOLERANCE`] of the boundary are clamped onto it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    pub fn new() -> Self {
        Self
    }
}

impl Interpolator for LinearInterpolator {
    fn evaluate<T: PixelValue>(&self, values: &[T], size: [usize; 3], index: &Point3) -> Option<f64> {
        let mut lo = [0usize; 3];
        let mut hi = [0usize; 3];
        let mut frac = [0.0f64; 3];
        for axis in 0..3 {
            let last = (size[axis] - 1) as f64;
            let c = index[axis];
            if !(c >= -INDEX_TOLERANCE && c <= last + INDEX_TOLERANCE) {
                return None;
            }
            let c = c.clamp(0.0, last);
            let f = c.floor();
            lo[axis] = f as usize;
            hi[axis] = (lo[axis] + 1).min(size[axis] - 1);
            frac[axis] = c - f;
        }

        let at = |x: usize, y: usize, z: usize| -> Option<f64> {
            values.get(offset(size, x, y, z)).map(|v| v.to_f64())
        };

        let [fx, fy, fz] = frac;
        let c000 = at(lo[0], lo[1], lo[2])?;
        let c100 = at(hi[0], lo[1], lo[2])?;
        let c010 = at(lo[0], hi[1], lo[2])?;
        let c110 = at(hi[0], hi[1], lo[2])?;
        let c001 = at(lo[0], lo[1], hi[2])?;
        let c101 = at(hi[0], lo[1], hi[2])?;
        let c011 = at(lo[0], hi[1], hi[2])?;
        let c111 = at(hi[0], hi[1], hi[2])?;

        let c00 = c000 + (c100 - c000) * fx;
        let c10 = c010 + (c110 - c010) * fx;
        let c01 = c001 + (c101 - c001) * fx;
        let c11 = c011 + (c111 - c011) * fx;

        let c0 = c00 + (c10 - c00) * fy;
        let c1 = c01 + (c11 - c01) * fy;

        Some(c0 + (c1 - c0) * fz)
    }
}
