//! Centered initialization of rigid transforms.

use serde::{Deserialize, Serialize};
use crate::image::{ImageGeometry, Volume};
use crate::spatial::{Point3, Vector3};
use super::rigid::RigidTransform;

/// How the two image centers are located.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitializerMode {
    /// Physical midpoint of each image's index bounding box.
    #[default]
    Geometry,
    /// Intensity-weighted centroid of each image.
    Moments,
}

/// Seeds a rigid transform so that the fixed image center maps onto the
/// moving image center.
///
/// The resulting transform rotates about the fixed center, has zero
/// rotation and translates by `moving_center - fixed_center`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CenteredTransformInitializer {
    mode: InitializerMode,
}

impl CenteredTransformInitializer {
    pub fn new(mode: InitializerMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> InitializerMode {
        self.mode
    }

    pub fn initialize(&self, fixed: &Volume, moving: &Volume) -> RigidTransform {
        match self.mode {
            InitializerMode::Geometry => initialize_centered(fixed.geometry(), moving.geometry()),
            InitializerMode::Moments => {
                let fixed_center = center_of_mass(fixed);
                let moving_center = center_of_mass(moving);
                centered_at(fixed_center, moving_center)
            }
        }
    }
}

/// Geometry-mode initialization from the two grids alone.
pub fn initialize_centered(fixed: &ImageGeometry, moving: &ImageGeometry) -> RigidTransform {
    centered_at(fixed.geometric_center(), moving.geometric_center())
}

fn centered_at(fixed_center: Point3, moving_center: Point3) -> RigidTransform {
    RigidTransform::new(fixed_center, Vector3::zeros(), moving_center - fixed_center)
}

/// Intensity-weighted centroid in physical space. Falls back to the
/// geometric center when the total mass is not positive.
fn center_of_mass(volume: &Volume) -> Point3 {
    let geometry = volume.geometry();
    let mut mass = 0.0;
    let mut weighted = Vector3::zeros();
    for (offset, value) in volume.data().to_f64_vec().into_iter().enumerate() {
        if value == 0.0 {
            continue;
        }
        let p = geometry.voxel_to_physical(geometry.voxel_index(offset));
        weighted = weighted + p.coords() * value;
        mass += value;
    }
    if mass > f64::EPSILON {
        Point3::new((weighted * (1.0 / mass)).to_array())
    } else {
        tracing::warn!("Image has no positive mass, using its geometric center");
        geometry.geometric_center()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Direction3, Spacing3};

    #[test]
    fn test_geometry_mode_translation() {
        let fixed = ImageGeometry::new(
            [11, 11, 11],
            Point3::origin(),
            Spacing3::uniform(1.0),
            Direction3::identity(),
        )
        .unwrap();
        let moving = ImageGeometry::new(
            [21, 11, 5],
            Point3::new([3.0, -2.0, 1.0]),
            Spacing3::new([0.5, 1.0, 2.0]),
            Direction3::identity(),
        )
        .unwrap();

        let t = initialize_centered(&fixed, &moving);
        // Fixed center (5, 5, 5); moving center (3 + 5, -2 + 5, 1 + 4).
        assert_eq!(*t.center(), Point3::new([5.0, 5.0, 5.0]));
        assert_eq!(*t.translation(), Vector3::new([3.0, -2.0, 0.0]));
        assert_eq!(*t.angles(), Vector3::zeros());
    }

    #[test]
    fn test_moments_mode_tracks_mass() {
        let geometry = ImageGeometry::with_size([8, 8, 8]).unwrap();
        let fixed = Volume::from_fn(geometry, |[x, y, z]| if [x, y, z] == [2, 2, 2] { 1.0f32 } else { 0.0 });
        let moving = Volume::from_fn(geometry, |[x, y, z]| if [x, y, z] == [5, 2, 3] { 4.0f32 } else { 0.0 });

        let t = CenteredTransformInitializer::new(InitializerMode::Moments).initialize(&fixed, &moving);
        assert_eq!(*t.center(), Point3::new([2.0, 2.0, 2.0]));
        assert_eq!(*t.translation(), Vector3::new([3.0, 0.0, 1.0]));
    }
}
