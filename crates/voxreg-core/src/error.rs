//! Error types for volume construction and conversion.

use thiserror::Error;
use crate::image::PixelType;

/// Errors raised while building, converting or validating volumes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    /// Malformed geometry: non-positive spacing, non-orthonormal direction
    /// or an empty axis.
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// An operation received a pixel type it does not accept.
    #[error("Pixel type mismatch: expected {expected:?}, got {actual:?}")]
    PixelTypeMismatch {
        expected: PixelType,
        actual: PixelType,
    },

    /// The voxel buffer does not match the declared size.
    #[error("Buffer length mismatch: size {size:?} needs {expected} voxels, got {actual}")]
    BufferLength {
        size: [usize; 3],
        expected: usize,
        actual: usize,
    },

    /// Tensor data could not be read back into a volume.
    #[error("Tensor conversion error: {0}")]
    Tensor(String),
}

/// Result type for volume operations.
pub type Result<T> = std::result::Result<T, ImageError>;

impl ImageError {
    /// Create a geometry error.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }
}
