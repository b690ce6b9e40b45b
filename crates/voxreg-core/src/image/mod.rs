//! Volume types and geometry.
//!
//! A [`Volume`] is a dense 3D scalar array together with the
//! [`ImageGeometry`] that places it in physical space. Voxel data is stored
//! row-major with axis order `[z, y, x]`; sizes, indices and spacing are
//! given in `(x, y, z)` order.

pub mod pixel;
pub mod geometry;
pub mod volume;

pub use pixel::{PixelType, PixelValue, VolumeData};
pub use geometry::ImageGeometry;
pub use volume::Volume;
