//! Dense scalar volume with physical geometry.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use crate::error::{ImageError, Result};
use crate::spatial::{Direction3, Point3, Spacing3};
use super::geometry::ImageGeometry;
use super::pixel::{PixelType, PixelValue, VolumeData};

/// A 3D scalar image.
///
/// Volumes are read-only once built; filters produce new volumes rather
/// than mutating their input.
///
/// # Examples
/// ```rust
/// use voxreg_core::image::{ImageGeometry, Volume};
///
/// let geometry = ImageGeometry::with_size([4, 4, 2]).unwrap();
/// let volume = Volume::from_fn(geometry, |[x, y, z]| (x + y + z) as f32);
/// assert_eq!(volume.shape(), [2, 4, 4]);
/// assert_eq!(volume.value_at([3, 1, 1]), Some(5.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    geometry: ImageGeometry,
    data: VolumeData,
}

impl Volume {
    /// Create a volume, checking geometry and buffer length.
    pub fn new(geometry: ImageGeometry, data: VolumeData) -> Result<Self> {
        geometry.validate()?;
        let expected = geometry.num_voxels();
        if data.len() != expected {
            return Err(ImageError::BufferLength {
                size: geometry.size(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { geometry, data })
    }

    /// Create a volume from a typed buffer in `[z, y, x]` order.
    pub fn from_vec<T: PixelValue>(geometry: ImageGeometry, values: Vec<T>) -> Result<Self> {
        Self::new(geometry, T::into_data(values))
    }

    /// Fill a volume by evaluating `f` at every voxel index `[x, y, z]`.
    pub fn from_fn<T, F>(geometry: ImageGeometry, f: F) -> Self
    where
        T: PixelValue,
        F: Fn([usize; 3]) -> T,
    {
        let values = (0..geometry.num_voxels())
            .map(|offset| f(geometry.voxel_index(offset)))
            .collect();
        Self { geometry, data: T::into_data(values) }
    }

    /// A volume of `pixel_type` filled with `value`.
    pub fn filled(geometry: ImageGeometry, pixel_type: PixelType, value: f64) -> Self {
        let data = VolumeData::from_f64_values(
            pixel_type,
            std::iter::repeat(value).take(geometry.num_voxels()),
        );
        Self { geometry, data }
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    pub fn data(&self) -> &VolumeData {
        &self.data
    }

    pub fn into_data(self) -> VolumeData {
        self.data
    }

    pub fn pixel_type(&self) -> PixelType {
        self.data.pixel_type()
    }

    /// Size in `(x, y, z)` order.
    pub fn size(&self) -> [usize; 3] {
        self.geometry.size()
    }

    /// Shape in storage order `[z, y, x]`.
    pub fn shape(&self) -> [usize; 3] {
        self.geometry.shape()
    }

    pub fn origin(&self) -> &Point3 {
        self.geometry.origin()
    }

    pub fn spacing(&self) -> &Spacing3 {
        self.geometry.spacing()
    }

    pub fn direction(&self) -> &Direction3 {
        self.geometry.direction()
    }

    /// Value of voxel `[x, y, z]`, or `None` outside the grid.
    pub fn value_at(&self, index: [usize; 3]) -> Option<f64> {
        let size = self.size();
        if (0..3).any(|axis| index[axis] >= size[axis]) {
            return None;
        }
        self.data.value(self.geometry.linear_index(index))
    }

    /// Borrow the buffer as `T`.
    pub fn as_slice<T: PixelValue>(&self) -> Result<&[T]> {
        T::slice_of(&self.data).ok_or(ImageError::PixelTypeMismatch {
            expected: T::PIXEL_TYPE,
            actual: self.pixel_type(),
        })
    }

    /// Fail unless the volume holds `expected` pixels.
    pub fn require_pixel_type(&self, expected: PixelType) -> Result<()> {
        if self.pixel_type() == expected {
            Ok(())
        } else {
            Err(ImageError::PixelTypeMismatch {
                expected,
                actual: self.pixel_type(),
            })
        }
    }

    /// Same geometry, values converted to `pixel_type`.
    pub fn cast(&self, pixel_type: PixelType) -> Self {
        Self {
            geometry: self.geometry,
            data: self.data.cast(pixel_type),
        }
    }

    /// Minimum and maximum intensity.
    pub fn min_max(&self) -> (f64, f64) {
        // Non-empty by construction.
        self.data.min_max().unwrap_or((0.0, 0.0))
    }

    /// Values of slice `z` as `[row][col]` = `[y][x]`, flattened row-major.
    pub fn slice_values(&self, z: usize) -> Option<Vec<f64>> {
        let [nx, ny, nz] = self.size();
        if z >= nz {
            return None;
        }
        let start = z * nx * ny;
        Some((start..start + nx * ny).filter_map(|i| self.data.value(i)).collect())
    }

    /// Upload the intensities as a `[z, y, x]` float tensor.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 3> {
        let values: Vec<f32> = self.data.to_f64_vec().into_iter().map(|v| v as f32).collect();
        Tensor::from_data(TensorData::new(values, self.shape()), device)
    }

    /// Build a `Float32` volume from a `[z, y, x]` tensor laid out on `geometry`.
    pub fn from_tensor<B: Backend>(tensor: Tensor<B, 3>, geometry: ImageGeometry) -> Result<Self> {
        let dims = tensor.dims();
        if dims != geometry.shape() {
            return Err(ImageError::Tensor(format!(
                "tensor shape {:?} does not match geometry shape {:?}",
                dims,
                geometry.shape()
            )));
        }
        let values = tensor
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| ImageError::Tensor(format!("{:?}", e)))?;
        Self::from_vec(geometry, values)
    }
}
