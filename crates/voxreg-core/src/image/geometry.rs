//! Grid geometry: mapping between voxel indices and physical space.

use serde::{Deserialize, Serialize};
use crate::error::{ImageError, Result};
use crate::spatial::{Direction3, Point3, Spacing3, Vector3};

/// Size, origin, spacing and orientation of a voxel grid.
///
/// The physical point of continuous index `i` is
/// `origin + direction * (spacing ⊙ i)`. Index components are `(x, y, z)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageGeometry {
    size: [usize; 3],
    origin: Point3,
    spacing: Spacing3,
    direction: Direction3,
}

impl ImageGeometry {
    /// Create a validated geometry.
    pub fn new(
        size: [usize; 3],
        origin: Point3,
        spacing: Spacing3,
        direction: Direction3,
    ) -> Result<Self> {
        let geometry = Self { size, origin, spacing, direction };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Unit spacing, zero origin and identity direction.
    pub fn with_size(size: [usize; 3]) -> Result<Self> {
        Self::new(size, Point3::origin(), Spacing3::uniform(1.0), Direction3::identity())
    }

    /// Check the invariants every volume relies on.
    pub fn validate(&self) -> Result<()> {
        if self.size.iter().any(|&n| n == 0) {
            return Err(ImageError::geometry(format!(
                "size must be non-zero along every axis, got {:?}",
                self.size
            )));
        }
        for axis in 0..3 {
            let s = self.spacing[axis];
            if !(s.is_finite() && s > 0.0) {
                return Err(ImageError::geometry(format!(
                    "spacing must be positive and finite, got {:?}",
                    self.spacing.to_array()
                )));
            }
        }
        if !self.origin.is_finite() {
            return Err(ImageError::geometry("origin must be finite"));
        }
        if !self.direction.is_orthonormal() {
            return Err(ImageError::geometry(format!(
                "direction must be orthonormal, determinant is {}",
                self.direction.determinant()
            )));
        }
        Ok(())
    }

    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    pub fn spacing(&self) -> &Spacing3 {
        &self.spacing
    }

    pub fn direction(&self) -> &Direction3 {
        &self.direction
    }

    /// Array shape in storage order `[z, y, x]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.size[2], self.size[1], self.size[0]]
    }

    pub fn num_voxels(&self) -> usize {
        self.size.iter().product()
    }

    /// Linear storage offset of voxel `[x, y, z]`.
    #[inline]
    pub fn linear_index(&self, index: [usize; 3]) -> usize {
        (index[2] * self.size[1] + index[1]) * self.size[0] + index[0]
    }

    /// Voxel `[x, y, z]` stored at linear offset `offset`.
    #[inline]
    pub fn voxel_index(&self, offset: usize) -> [usize; 3] {
        let nx = self.size[0];
        let ny = self.size[1];
        [offset % nx, (offset / nx) % ny, offset / (nx * ny)]
    }

    /// Physical point of a continuous index.
    pub fn index_to_physical(&self, index: &Point3) -> Point3 {
        let scaled = index.coords().component_mul(&self.spacing);
        self.origin + self.direction * scaled
    }

    /// Physical point of the centre of voxel `[x, y, z]`.
    pub fn voxel_to_physical(&self, index: [usize; 3]) -> Point3 {
        self.index_to_physical(&Point3::new([
            index[0] as f64,
            index[1] as f64,
            index[2] as f64,
        ]))
    }

    /// Continuous index of a physical point. The result may lie outside
    /// the grid.
    pub fn physical_to_continuous_index(&self, point: &Point3) -> Point3 {
        // The direction is orthonormal, so its inverse is the transpose.
        let rotated = self.direction.transpose() * (*point - self.origin);
        let index = rotated.component_div(&self.spacing);
        Point3::new(index.to_array())
    }

    /// True if the continuous index lies within `[0, size - 1]` on every axis.
    pub fn contains_index(&self, index: &Point3) -> bool {
        (0..3).all(|axis| index[axis] >= 0.0 && index[axis] <= (self.size[axis] - 1) as f64)
    }

    /// Physical point at the midpoint of the index bounding box.
    pub fn geometric_center(&self) -> Point3 {
        let mid = Point3::new([
            (self.size[0] - 1) as f64 / 2.0,
            (self.size[1] - 1) as f64 / 2.0,
            (self.size[2] - 1) as f64 / 2.0,
        ]);
        self.index_to_physical(&mid)
    }

    /// Physical points of the eight corner voxels.
    pub fn corners(&self) -> [Point3; 8] {
        let last = [
            (self.size[0] - 1) as f64,
            (self.size[1] - 1) as f64,
            (self.size[2] - 1) as f64,
        ];
        let mut corners = [Point3::origin(); 8];
        for (bits, corner) in corners.iter_mut().enumerate() {
            let index = Point3::new([
                if bits & 1 != 0 { last[0] } else { 0.0 },
                if bits & 2 != 0 { last[1] } else { 0.0 },
                if bits & 4 != 0 { last[2] } else { 0.0 },
            ]);
            *corner = self.index_to_physical(&index);
        }
        corners
    }

    /// Physical extent `size * spacing` along each index axis.
    pub fn physical_extent(&self) -> Vector3 {
        Vector3::new([
            self.size[0] as f64 * self.spacing[0],
            self.size[1] as f64 * self.spacing[1],
            self.size[2] as f64 * self.spacing[2],
        ])
    }
}
