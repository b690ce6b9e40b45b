//! Transform trait for spatial coordinate transformations.

use crate::spatial::Point3;

/// Maps physical points from one space to another.
///
/// During registration and resampling a transform maps points of the fixed
/// (output) grid into the moving (source) image.
pub trait Transform: Send + Sync + std::fmt::Debug {
    fn transform_point(&self, point: &Point3) -> Point3;
}

/// The transform that leaves every point unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IdentityTransform;

impl Transform for IdentityTransform {
    #[inline]
    fn transform_point(&self, point: &Point3) -> Point3 {
        *point
    }
}

impl<T: Transform + ?Sized> Transform for &T {
    fn transform_point(&self, point: &Point3) -> Point3 {
        (**self).transform_point(point)
    }
}

impl<T: Transform + ?Sized> Transform for Box<T> {
    fn transform_point(&self, point: &Point3) -> Point3 {
        (**self).transform_point(point)
    }
}
