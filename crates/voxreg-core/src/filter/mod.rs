//! Image filters.

pub mod cast;
pub mod resample;

pub use cast::CastImageFilter;
pub use resample::{resample_to_size, ResampleImageFilter};
