//! Core volume types for voxreg.
//!
//! Geometry, pixel storage, rigid transforms, interpolation and
//! resampling. The registration crate builds on these.

pub mod error;
pub mod image;
pub mod spatial;
pub mod transform;
pub mod interpolation;
pub mod filter;

pub use error::{ImageError, Result};
pub use image::{ImageGeometry, PixelType, PixelValue, Volume, VolumeData};
pub use spatial::{Direction, Point, Spacing, Vector};
