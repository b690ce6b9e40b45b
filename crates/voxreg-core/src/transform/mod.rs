//! Transform types and operations.
//!
//! This module provides the [`Transform`] trait, the 6-parameter
//! [`RigidTransform`] optimized during registration and the centered
//! initializer that seeds it.

pub mod trait_;
pub mod rigid;
pub mod initializer;

pub use trait_::{IdentityTransform, Transform};
pub use rigid::{RigidParameters, RigidTransform};
pub use initializer::{CenteredTransformInitializer, InitializerMode, initialize_centered};
