//! Rigid registration driver.
//!
//! [`RegistrationEngine`] ties the pieces together: centered initialization,
//! sampled Mattes mutual information, scaled gradient descent and a final
//! resample of the moving volume onto the fixed grid.

use std::sync::Arc;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use voxreg_core::filter::{CastImageFilter, ResampleImageFilter};
use voxreg_core::image::{PixelType, Volume};
use voxreg_core::interpolation::InterpolationMode;
use voxreg_core::transform::{CenteredTransformInitializer, InitializerMode, RigidParameters, RigidTransform};
use crate::error::Result;
use crate::metric::{GradientMode, MattesMutualInformation, Metric, RandomSampler, SampleSet, SamplingPolicy};
use crate::optimizer::{
    CostFunction, GradientDescent, GradientDescentConfig, PhysicalShiftEstimator, ShiftEstimator, StopCondition,
};
use crate::progress::{CancellationToken, ProgressCallback};
use crate::validation::{validate_registration_config, validate_volume};

/// Pixel type every volume is cast to before it reaches the metric.
pub const INTERNAL_PIXEL_TYPE: PixelType = PixelType::Float32;

/// Registration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub number_of_histogram_bins: usize,
    /// Fraction of fixed voxels used as metric samples.
    pub sampling_percentage: f64,
    pub sampling_policy: SamplingPolicy,
    /// Sampler seed. A random seed is drawn, logged and reported when unset.
    pub seed: Option<u64>,
    /// Used by the metric and by the final resample.
    pub interpolator: InterpolationMode,
    pub gradient_mode: GradientMode,
    pub initializer_mode: InitializerMode,
    pub optimizer: GradientDescentConfig,
    /// Fraction of samples that must land inside the moving image.
    pub minimum_valid_fraction: f64,
    /// Value for aligned voxels that map outside the moving image.
    pub default_pixel_value: f64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            number_of_histogram_bins: 250,
            sampling_percentage: 0.01,
            sampling_policy: SamplingPolicy::FixedPerRun,
            seed: None,
            interpolator: InterpolationMode::NearestNeighbor,
            gradient_mode: GradientMode::Auto,
            initializer_mode: InitializerMode::Geometry,
            optimizer: GradientDescentConfig::default(),
            minimum_valid_fraction: 1.0 / 16.0,
            default_pixel_value: 0.0,
        }
    }
}

impl RegistrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_number_of_histogram_bins(mut self, bins: usize) -> Self {
        self.number_of_histogram_bins = bins;
        self
    }

    pub fn with_sampling_percentage(mut self, percentage: f64) -> Self {
        self.sampling_percentage = percentage;
        self
    }

    pub fn with_sampling_policy(mut self, policy: SamplingPolicy) -> Self {
        self.sampling_policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_interpolator(mut self, interpolator: InterpolationMode) -> Self {
        self.interpolator = interpolator;
        self
    }

    pub fn with_gradient_mode(mut self, mode: GradientMode) -> Self {
        self.gradient_mode = mode;
        self
    }

    pub fn with_initializer_mode(mut self, mode: InitializerMode) -> Self {
        self.initializer_mode = mode;
        self
    }

    pub fn with_optimizer(mut self, optimizer: GradientDescentConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_minimum_valid_fraction(mut self, fraction: f64) -> Self {
        self.minimum_valid_fraction = fraction;
        self
    }

    pub fn with_default_pixel_value(mut self, value: f64) -> Self {
        self.default_pixel_value = value;
        self
    }
}

/// Result of a successful registration.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    /// Maps fixed physical points into the moving image.
    pub transform: RigidTransform,
    /// Moving volume resampled onto the fixed grid, in the moving pixel type.
    pub aligned: Volume,
    pub initial_transform: RigidTransform,
    pub stop_condition: StopCondition,
    pub iterations: usize,
    /// Best metric value reached.
    pub metric_value: f64,
    /// Metric value at the initial transform.
    pub initial_metric_value: f64,
    /// Best value after each iteration.
    pub metric_history: Vec<f64>,
    pub learning_rate: f64,
    pub seed: u64,
    pub number_of_samples: usize,
    /// Pixel types before the cast to [`INTERNAL_PIXEL_TYPE`].
    pub fixed_pixel_type: PixelType,
    pub moving_pixel_type: PixelType,
}

/// Metric, samples and transform seen by the optimizer as a plain cost function.
struct MattesCost<'a> {
    metric: MattesMutualInformation<'a>,
    fixed: &'a Volume,
    sampler: RandomSampler,
    samples: SampleSet,
    policy: SamplingPolicy,
    transform: RigidTransform,
    evaluations: usize,
}

impl CostFunction for MattesCost<'_> {
    fn number_of_parameters(&self) -> usize {
        6
    }

    fn evaluate(&mut self, parameters: &DVector<f64>) -> Result<(f64, DVector<f64>)> {
        if self.policy == SamplingPolicy::RedrawEachIteration && self.evaluations > 0 {
            self.samples = self.sampler.draw(self.fixed);
        }
        self.evaluations += 1;
        self.transform
            .set_parameters(&RigidParameters::from_iterator(parameters.iter().copied()));
        let evaluation = self.metric.evaluate(&self.transform, &self.samples)?;
        tracing::trace!(
            "{} = {:.6} from {} of {} samples",
            self.metric.name(),
            evaluation.value,
            evaluation.valid_samples,
            self.samples.len()
        );
        Ok((
            evaluation.value,
            DVector::from_iterator(6, evaluation.gradient.iter().copied()),
        ))
    }
}

/// Rigid registration of a moving volume onto a fixed volume.
#[derive(Clone, Default)]
pub struct RegistrationEngine {
    config: RegistrationConfig,
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    cancellation: CancellationToken,
}

impl RegistrationEngine {
    pub fn new(config: RegistrationConfig) -> Self {
        Self {
            config,
            callbacks: Vec::new(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Register `moving` onto `fixed`.
    ///
    /// The returned transform maps fixed physical points into the moving
    /// image; `aligned` is `moving` resampled through it on the fixed grid.
    /// The call is deterministic for a configured seed.
    pub fn register(&self, moving: &Volume, fixed: &Volume) -> Result<RegistrationOutcome> {
        let config = &self.config;
        validate_registration_config(config)?;
        validate_volume(fixed, "Fixed")?;
        validate_volume(moving, "Moving")?;

        let seed = config.seed.unwrap_or_else(|| {
            let seed = rand::random::<u64>();
            tracing::info!("No seed configured, drew {}", seed);
            seed
        });
        tracing::info!("Registration seed: {}", seed);

        let fixed_internal = to_internal(fixed, "fixed");
        let moving_internal = to_internal(moving, "moving");

        let initial_transform = CenteredTransformInitializer::new(config.initializer_mode)
            .initialize(&fixed_internal, &moving_internal);
        tracing::info!(
            "Initial transform: center {:?}, translation {:?}",
            initial_transform.center().to_array(),
            initial_transform.translation().to_array()
        );

        let shift = PhysicalShiftEstimator::from_geometry(initial_transform.clone(), fixed.geometry());
        let initial = DVector::from_iterator(6, initial_transform.parameters().iter().copied());
        // Difference steps move the fixed corners by one minimum spacing.
        let unit_shift = fixed.spacing().min_component();
        let difference_steps = RigidParameters::from_iterator(
            shift.estimate_scales(&initial).iter().map(|scale| unit_shift / scale.sqrt()),
        );

        let metric = MattesMutualInformation::new(
            &fixed_internal,
            &moving_internal,
            config.number_of_histogram_bins,
            config.interpolator,
        )?
        .with_minimum_valid_fraction(config.minimum_valid_fraction)
        .with_gradient_mode(config.gradient_mode)
        .with_difference_steps(difference_steps);

        let mut sampler = RandomSampler::new(config.sampling_percentage, seed)?;
        let samples = sampler.draw(&fixed_internal);
        let number_of_samples = samples.len();
        tracing::info!(
            "Sampling {} of {} fixed voxels ({:?})",
            number_of_samples,
            fixed.geometry().num_voxels(),
            config.sampling_policy
        );

        let mut optimizer_config = config.optimizer.clone();
        if optimizer_config.maximum_step_size_in_physical_units.is_none() {
            let step = fixed.spacing().min_component();
            tracing::debug!("Maximum step size defaults to minimum fixed spacing {}", step);
            optimizer_config.maximum_step_size_in_physical_units = Some(step);
        }

        let mut optimizer = GradientDescent::new(optimizer_config).with_cancellation(self.cancellation.clone());
        for callback in &self.callbacks {
            optimizer = optimizer.with_callback(callback.clone());
        }

        let mut cost = MattesCost {
            metric,
            fixed: &fixed_internal,
            sampler,
            samples,
            policy: config.sampling_policy,
            transform: initial_transform.clone(),
            evaluations: 0,
        };
        let result = optimizer.optimize(&mut cost, initial, &shift)?;

        let transform = initial_transform
            .with_parameters(&RigidParameters::from_iterator(result.parameters.iter().copied()));
        tracing::info!(
            "Registration stopped ({:?}) after {} iterations, metric {:.6}, parameters {:?}",
            result.stop_condition,
            result.iterations,
            result.best_value,
            transform.parameters().as_slice()
        );

        let aligned = ResampleImageFilter::new(*fixed.geometry(), transform.clone(), config.interpolator)
            .with_default_pixel_value(config.default_pixel_value)
            .apply(moving)?;

        Ok(RegistrationOutcome {
            transform,
            aligned,
            initial_transform,
            stop_condition: result.stop_condition,
            iterations: result.iterations,
            metric_value: result.best_value,
            initial_metric_value: result.value_history.first().copied().unwrap_or(f64::NAN),
            metric_history: result.best_value_history,
            learning_rate: result.learning_rate,
            seed,
            number_of_samples,
            fixed_pixel_type: fixed.pixel_type(),
            moving_pixel_type: moving.pixel_type(),
        })
    }
}

fn to_internal(volume: &Volume, name: &str) -> Volume {
    if volume.pixel_type() != INTERNAL_PIXEL_TYPE {
        tracing::info!(
            "Casting {} image from {:?} to {:?}",
            name,
            volume.pixel_type(),
            INTERNAL_PIXEL_TYPE
        );
    }
    CastImageFilter::new(INTERNAL_PIXEL_TYPE).apply(volume)
}
