//! Validation utilities for registration operations.
//!
//! Configuration values are checked once, before any image work starts,
//! so that bad settings surface as [`RegistrationError::InvalidConfiguration`]
//! instead of a failure deep inside the optimizer.

use voxreg_core::image::Volume;
use crate::error::{RegistrationError, Result};
use crate::metric::histogram::MIN_BINS;
use crate::optimizer::GradientDescentConfig;
use crate::registration::RegistrationConfig;

/// Validate that a learning rate is positive and finite.
pub fn validate_learning_rate(learning_rate: f64) -> Result<()> {
    if !learning_rate.is_finite() || learning_rate <= 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Learning rate must be positive and finite, got {}",
            learning_rate
        )));
    }
    Ok(())
}

/// Validate the iteration cap.
pub fn validate_iterations(iterations: usize) -> Result<()> {
    if iterations == 0 {
        return Err(RegistrationError::invalid_configuration(
            "Number of iterations must be positive",
        ));
    }
    Ok(())
}

/// Validate the histogram size. Padding leaves `bins - 4` usable bins.
pub fn validate_histogram_bins(bins: usize) -> Result<()> {
    if bins < MIN_BINS {
        return Err(RegistrationError::invalid_configuration(format!(
            "Number of histogram bins must be at least {}, got {}",
            MIN_BINS, bins
        )));
    }
    Ok(())
}

/// Validate a sampling fraction in `(0, 1]`.
pub fn validate_sampling_percentage(percentage: f64) -> Result<()> {
    if !(percentage > 0.0 && percentage <= 1.0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "Sampling percentage must be in (0, 1], got {}",
            percentage
        )));
    }
    Ok(())
}

/// Validate the convergence window size.
pub fn validate_window_size(size: usize) -> Result<()> {
    if size < 2 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Convergence window needs at least 2 values, got {}",
            size
        )));
    }
    Ok(())
}

/// Validate every optimizer setting.
pub fn validate_gradient_descent_config(config: &GradientDescentConfig) -> Result<()> {
    validate_learning_rate(config.learning_rate)?;
    validate_iterations(config.number_of_iterations)?;
    validate_window_size(config.convergence_window_size)?;
    if !config.convergence_minimum_value.is_finite() || config.convergence_minimum_value < 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Convergence minimum value must be non-negative, got {}",
            config.convergence_minimum_value
        )));
    }
    if !(config.relaxation_factor > 0.0 && config.relaxation_factor <= 1.0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "Relaxation factor must be in (0, 1], got {}",
            config.relaxation_factor
        )));
    }
    if let Some(step) = config.maximum_step_size_in_physical_units {
        if !step.is_finite() || step <= 0.0 {
            return Err(RegistrationError::invalid_configuration(format!(
                "Maximum step size must be positive, got {}",
                step
            )));
        }
    }
    Ok(())
}

/// Validate a full registration configuration.
pub fn validate_registration_config(config: &RegistrationConfig) -> Result<()> {
    validate_histogram_bins(config.number_of_histogram_bins)?;
    validate_sampling_percentage(config.sampling_percentage)?;
    if !(config.minimum_valid_fraction > 0.0 && config.minimum_valid_fraction <= 1.0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "Minimum valid sample fraction must be in (0, 1], got {}",
            config.minimum_valid_fraction
        )));
    }
    if !config.default_pixel_value.is_finite() {
        return Err(RegistrationError::invalid_configuration(
            "Default pixel value must be finite",
        ));
    }
    validate_gradient_descent_config(&config.optimizer)
}

/// Validate that a volume can take part in a registration.
pub fn validate_volume(volume: &Volume, name: &str) -> Result<()> {
    volume
        .geometry()
        .validate()
        .map_err(|e| RegistrationError::geometry(format!("{} image: {}", name, e)))?;
    if volume.data().len() != volume.geometry().num_voxels() {
        return Err(RegistrationError::geometry(format!(
            "{} image holds {} values for {} voxels",
            name,
            volume.data().len(),
            volume.geometry().num_voxels()
        )));
    }
    validate_finite_intensities(volume, name)
}

/// Reject volumes holding NaN or infinite intensities; they have no
/// histogram bin.
pub fn validate_finite_intensities(volume: &Volume, name: &str) -> Result<()> {
    let count = volume.data().count_non_finite();
    if count > 0 {
        return Err(RegistrationError::NonFiniteIntensity {
            image: name.to_string(),
            count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxreg_core::image::ImageGeometry;

    #[test]
    fn test_validate_learning_rate() {
        assert!(validate_learning_rate(0.5).is_ok());
        assert!(validate_learning_rate(0.0).is_err());
        assert!(validate_learning_rate(-1.0).is_err());
        assert!(validate_learning_rate(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_histogram_bins() {
        assert!(validate_histogram_bins(250).is_ok());
        assert!(validate_histogram_bins(MIN_BINS).is_ok());
        assert!(validate_histogram_bins(MIN_BINS - 1).is_err());
    }

    #[test]
    fn test_validate_sampling_percentage() {
        assert!(validate_sampling_percentage(0.01).is_ok());
        assert!(validate_sampling_percentage(1.0).is_ok());
        assert!(validate_sampling_percentage(0.0).is_err());
        assert!(validate_sampling_percentage(1.5).is_err());
    }

    #[test]
    fn test_validate_gradient_descent_config() {
        assert!(validate_gradient_descent_config(&GradientDescentConfig::default()).is_ok());
        let config = GradientDescentConfig::default().with_convergence_window_size(1);
        assert!(validate_gradient_descent_config(&config).is_err());
        let config = GradientDescentConfig::default().with_maximum_step_size_in_physical_units(-1.0);
        assert!(validate_gradient_descent_config(&config).is_err());
        let config = GradientDescentConfig::default().with_number_of_iterations(0);
        assert!(validate_gradient_descent_config(&config).is_err());
        let config = GradientDescentConfig::default().with_relaxation_factor(0.0);
        assert!(validate_gradient_descent_config(&config).is_err());
        let config = GradientDescentConfig::default().with_relaxation_factor(1.0);
        assert!(validate_gradient_descent_config(&config).is_ok());
    }

    #[test]
    fn test_validate_registration_config() {
        assert!(validate_registration_config(&RegistrationConfig::default()).is_ok());
        let config = RegistrationConfig::default().with_number_of_histogram_bins(3);
        assert!(matches!(
            validate_registration_config(&config),
            Err(RegistrationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_validate_volume() {
        let geometry = ImageGeometry::with_size([4, 4, 4]).unwrap();
        let volume = Volume::from_fn(geometry, |_| 0.0f32);
        assert!(validate_volume(&volume, "fixed").is_ok());
    }

    #[test]
    fn test_validate_volume_rejects_nan() {
        let geometry = ImageGeometry::with_size([4, 4, 4]).unwrap();
        let volume = Volume::from_fn(geometry, |index| if index == [1, 2, 3] { f32::NAN } else { 1.0 });
        assert_eq!(
            validate_volume(&volume, "Fixed"),
            Err(RegistrationError::NonFiniteIntensity { image: "Fixed".into(), count: 1 })
        );
    }
}
