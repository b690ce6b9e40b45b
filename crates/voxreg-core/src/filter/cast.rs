//! Pixel type conversion filter.

use crate::image::{PixelType, Volume};

/// Converts a volume to another pixel type, keeping its geometry.
///
/// Conversion to integer types rounds to nearest and saturates at the
/// type's bounds.
#[derive(Debug, Clone, Copy)]
pub struct CastImageFilter {
    output_pixel_type: PixelType,
}

impl CastImageFilter {
    pub fn new(output_pixel_type: PixelType) -> Self {
        Self { output_pixel_type }
    }

    pub fn output_pixel_type(&self) -> PixelType {
        self.output_pixel_type
    }

    pub fn apply(&self, input: &Volume) -> Volume {
        if input.pixel_type() != self.output_pixel_type {
            tracing::debug!(
                "Casting {:?} volume of size {:?} to {:?}",
                input.pixel_type(),
                input.size(),
                self.output_pixel_type
            );
        }
        input.cast(self.output_pixel_type)
    }
}
