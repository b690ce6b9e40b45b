//! Error types for registration operations.
//!
//! This module provides structured error types for registration workflows.
//! Every variant is returned to the caller; none is swallowed internally.

use thiserror::Error;
use voxreg_core::image::PixelType;
use voxreg_core::ImageError;

/// Main error type for registration operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    /// Malformed input geometry.
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// The metric was given volumes that are not in the internal intensity
    /// representation.
    #[error("Pixel type mismatch: expected {expected:?}, got {actual:?}")]
    PixelTypeMismatch {
        expected: PixelType,
        actual: PixelType,
    },

    /// An input volume holds NaN or infinite intensities.
    #[error("{image} image holds {count} non-finite intensities")]
    NonFiniteIntensity {
        image: String,
        count: usize,
    },

    /// Too few sample points mapped inside the moving image.
    #[error("Degenerate sample set: {valid} valid samples, at least {required} required")]
    DegenerateSamples {
        valid: usize,
        required: usize,
    },

    /// The metric value or gradient became non-finite.
    #[error("Optimization diverged at iteration {iteration}: {reason}")]
    Diverged {
        iteration: usize,
        /// Parameters of the last finite evaluation.
        last_valid_parameters: Vec<f64>,
        reason: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create a geometry error.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a divergence error.
    pub fn diverged(iteration: usize, last_valid_parameters: &[f64], reason: impl Into<String>) -> Self {
        Self::Diverged {
            iteration,
            last_valid_parameters: last_valid_parameters.to_vec(),
            reason: reason.into(),
        }
    }
}

impl From<ImageError> for RegistrationError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::PixelTypeMismatch { expected, actual } => {
                Self::PixelTypeMismatch { expected, actual }
            }
            other => Self::Geometry(other.to_string()),
        }
    }
}
