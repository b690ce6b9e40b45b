//! Pixel types and typed voxel storage.

use serde::{Deserialize, Serialize};

/// Intensity representation of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelType {
    UInt8,
    Int16,
    UInt16,
    Int32,
    Float32,
    Float64,
}

impl PixelType {
    pub fn is_float(&self) -> bool {
        matches!(self, PixelType::Float32 | PixelType::Float64)
    }

    /// Size of one voxel in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            PixelType::UInt8 => 1,
            PixelType::Int16 | PixelType::UInt16 => 2,
            PixelType::Int32 | PixelType::Float32 => 4,
            PixelType::Float64 => 8,
        }
    }
}

/// Scalar types that can be stored in a [`VolumeData`].
///
/// Conversion from `f64` rounds to nearest and saturates at the type bounds
/// for integer types; NaN maps to zero.
pub trait PixelValue: Copy + Send + Sync + PartialEq + std::fmt::Debug + 'static {
    const PIXEL_TYPE: PixelType;

    fn to_f64(self) -> f64;

    fn from_f64(value: f64) -> Self;

    /// Wrap a buffer of this type.
    fn into_data(values: Vec<Self>) -> VolumeData;

    /// Borrow the buffer if `data` holds this type.
    fn slice_of(data: &VolumeData) -> Option<&[Self]>;
}

macro_rules! impl_integer_pixel {
    ($t:ty, $variant:ident) => {
        impl PixelValue for $t {
            const PIXEL_TYPE: PixelType = PixelType::$variant;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                // `as` saturates and maps NaN to 0.
                value.round() as $t
            }

            fn into_data(values: Vec<Self>) -> VolumeData {
                VolumeData::$variant(values)
            }

            fn slice_of(data: &VolumeData) -> Option<&[Self]> {
                match data {
                    VolumeData::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_integer_pixel!(u8, UInt8);
impl_integer_pixel!(i16, Int16);
impl_integer_pixel!(u16, UInt16);
impl_integer_pixel!(i32, Int32);

impl PixelValue for f32 {
    const PIXEL_TYPE: PixelType = PixelType::Float32;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn into_data(values: Vec<Self>) -> VolumeData {
        VolumeData::Float32(values)
    }

    fn slice_of(data: &VolumeData) -> Option<&[Self]> {
        match data {
            VolumeData::Float32(v) => Some(v),
            _ => None,
        }
    }
}

impl PixelValue for f64 {
    const PIXEL_TYPE: PixelType = PixelType::Float64;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    fn into_data(values: Vec<Self>) -> VolumeData {
        VolumeData::Float64(values)
    }

    fn slice_of(data: &VolumeData) -> Option<&[Self]> {
        match data {
            VolumeData::Float64(v) => Some(v),
            _ => None,
        }
    }
}

/// Voxel buffer tagged with its pixel type.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeData {
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

/// Run `$body` with `$v` bound to the typed buffer of `$data`.
#[macro_export]
macro_rules! with_volume_data {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            $crate::image::VolumeData::UInt8($v) => $body,
            $crate::image::VolumeData::Int16($v) => $body,
            $crate::image::VolumeData::UInt16($v) => $body,
            $crate::image::VolumeData::Int32($v) => $body,
            $crate::image::VolumeData::Float32($v) => $body,
            $crate::image::VolumeData::Float64($v) => $body,
        }
    };
}

impl VolumeData {
    pub fn pixel_type(&self) -> PixelType {
        match self {
            VolumeData::UInt8(_) => PixelType::UInt8,
            VolumeData::Int16(_) => PixelType::Int16,
            VolumeData::UInt16(_) => PixelType::UInt16,
            VolumeData::Int32(_) => PixelType::Int32,
            VolumeData::Float32(_) => PixelType::Float32,
            VolumeData::Float64(_) => PixelType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        with_volume_data!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at linear offset `i`, widened to `f64`.
    pub fn value(&self, i: usize) -> Option<f64> {
        with_volume_data!(self, v => v.get(i).map(|x| x.to_f64()))
    }

    /// All values widened to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_volume_data!(self, v => v.iter().map(|x| x.to_f64()).collect())
    }

    /// Build a buffer of `pixel_type` from `f64` values.
    pub fn from_f64_values(pixel_type: PixelType, values: impl Iterator<Item = f64>) -> Self {
        fn collect<T: PixelValue>(values: impl Iterator<Item = f64>) -> VolumeData {
            T::into_data(values.map(T::from_f64).collect())
        }
        match pixel_type {
            PixelType::UInt8 => collect::<u8>(values),
            PixelType::Int16 => collect::<i16>(values),
            PixelType::UInt16 => collect::<u16>(values),
            PixelType::Int32 => collect::<i32>(values),
            PixelType::Float32 => collect::<f32>(values),
            PixelType::Float64 => collect::<f64>(values),
        }
    }

    /// Convert every value to `pixel_type`. Returns a clone when the type
    /// already matches.
    pub fn cast(&self, pixel_type: PixelType) -> Self {
        if self.pixel_type() == pixel_type {
            return self.clone();
        }
        with_volume_data!(self, v => {
            Self::from_f64_values(pixel_type, v.iter().map(|x| x.to_f64()))
        })
    }

    /// Minimum and maximum value, or `None` for an empty buffer.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let (lo, hi) = with_volume_data!(self, v => v.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), x| {
                let x = x.to_f64();
                (lo.min(x), hi.max(x))
            },
        ));
        Some((lo, hi))
    }

    /// Number of NaN or infinite values. Integer buffers always report zero.
    pub fn count_non_finite(&self) -> usize {
        with_volume_data!(self, v => v.iter().filter(|x| !x.to_f64().is_finite()).count())
    }
}
