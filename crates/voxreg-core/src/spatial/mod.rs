//! Spatial types for points, vectors, spacing and direction cosines.
//!
//! All types are thin wrappers around nalgebra so that the usual linear
//! algebra stays available through `inner()` while the image code can speak
//! in terms of physical points and index-space vectors.

pub mod point;
pub mod vector;
pub mod direction;

pub use point::Point;
pub use vector::{Vector, Spacing};
pub use direction::Direction;

pub type Point3 = Point<3>;
pub type Vector3 = Vector<3>;
pub type Spacing3 = Spacing<3>;
pub type Direction3 = Direction<3>;
