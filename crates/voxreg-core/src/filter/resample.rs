//! Resample image filter.
//!
//! This module provides ResampleImageFilter which resamples an image
//! onto a new grid using a transform and an interpolator.

use rayon::prelude::*;
use crate::error::Result;
use crate::image::{ImageGeometry, PixelType, PixelValue, Volume, VolumeData};
use crate::interpolation::{InterpolationMode, Interpolator};
use crate::transform::{IdentityTransform, Transform};
use crate::with_volume_data;

/// Resample image filter.
///
/// For every output voxel the filter computes its physical point on the
/// output grid, maps it through the transform into input space, converts it
/// to a continuous input index and interpolates. Voxels whose index falls
/// outside the input get the default pixel value.
///
/// The transform maps Output Physical Space -> Input Physical Space, which
/// is the fixed-to-moving direction produced by registration.
///
/// # Type Parameters
/// * `T` - The transform type
/// * `I` - The interpolator type
#[derive(Debug, Clone)]
pub struct ResampleImageFilter<T, I = InterpolationMode>
where
    T: Transform,
    I: Interpolator,
{
    geometry: ImageGeometry,
    transform: T,
    interpolator: I,
    default_pixel_value: f64,
    output_pixel_type: Option<PixelType>,
}

impl<T, I> ResampleImageFilter<T, I>
where
    T: Transform,
    I: Interpolator,
{
    /// Create a new resample filter.
    ///
    /// # Arguments
    /// * `geometry` - Output grid (size, origin, spacing, direction)
    /// * `transform` - Transform from output space to input space
    /// * `interpolator` - Interpolator for input image sampling
    pub fn new(geometry: ImageGeometry, transform: T, interpolator: I) -> Self {
        Self {
            geometry,
            transform,
            interpolator,
            default_pixel_value: 0.0,
            output_pixel_type: None,
        }
    }

    /// Create from a reference image, using its grid as the output grid.
    pub fn new_from_reference(reference: &Volume, transform: T, interpolator: I) -> Self {
        Self::new(*reference.geometry(), transform, interpolator)
    }

    /// Set default pixel value for outside the field of view.
    pub fn with_default_pixel_value(mut self, value: f64) -> Self {
        self.default_pixel_value = value;
        self
    }

    /// Store the output as `pixel_type` instead of the input's type.
    pub fn with_output_pixel_type(mut self, pixel_type: PixelType) -> Self {
        self.output_pixel_type = Some(pixel_type);
        self
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// Apply filter to an input image.
    pub fn apply(&self, input: &Volume) -> Result<Volume> {
        let pixel_type = self.output_pixel_type.unwrap_or(input.pixel_type());
        let values = with_volume_data!(input.data(), v => self.sample(v, input.geometry()));
        let data = VolumeData::from_f64_values(pixel_type, values.into_iter());
        Volume::new(self.geometry, data)
    }

    fn sample<P: PixelValue>(&self, values: &[P], input: &ImageGeometry) -> Vec<f64> {
        let size = input.size();
        (0..self.geometry.num_voxels())
            .into_par_iter()
            .map(|offset| {
                let point = self.geometry.voxel_to_physical(self.geometry.voxel_index(offset));
                let mapped = self.transform.transform_point(&point);
                let index = input.physical_to_continuous_index(&mapped);
                self.interpolator
                    .evaluate(values, size, &index)
                    .unwrap_or(self.default_pixel_value)
            })
            .collect()
    }
}

/// Resample `image` onto a grid of `new_size` voxels covering the same
/// physical extent.
///
/// Spacing becomes `old_size * old_spacing / new_size` per axis; origin and
/// direction are kept. Values are taken by nearest neighbor under the
/// identity transform, with 0 outside, and the pixel type is preserved.
pub fn resample_to_size(image: &Volume, new_size: [usize; 3]) -> Result<Volume> {
    let old_size = image.size();
    let old_spacing = image.spacing();
    let mut spacing = *old_spacing;
    for axis in 0..3 {
        spacing[axis] = old_size[axis] as f64 * old_spacing[axis] / new_size[axis] as f64;
    }
    let geometry = ImageGeometry::new(new_size, *image.origin(), spacing, *image.direction())?;
    tracing::debug!(
        "Resampling {:?} -> {:?}, spacing {:?}",
        old_size,
        new_size,
        spacing.to_array()
    );
    ResampleImageFilter::new(geometry, IdentityTransform, InterpolationMode::NearestNeighbor)
        .apply(image)
}
