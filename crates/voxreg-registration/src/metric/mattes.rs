//! Mattes mutual information over a sparse sample set.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use voxreg_core::image::{ImageGeometry, PixelType, Volume};
use voxreg_core::interpolation::{InterpolationMode, Interpolator};
use voxreg_core::spatial::{Point3, Vector3};
use voxreg_core::transform::{RigidParameters, RigidTransform, Transform};
use crate::error::{RegistrationError, Result};
use crate::validation::validate_finite_intensities;
use super::histogram::{IntensityBinning, JointHistogram, ParzenWindow, MIN_BINS};
use super::sampler::SampleSet;
use super::trait_::{Metric, MetricEvaluation};

/// Samples per rayon job.
const MIN_SAMPLES_PER_JOB: usize = 256;

/// Upper bound on partial histograms per evaluation.
const MAX_PARTIAL_HISTOGRAMS: usize = 64;

/// How the parameter gradient is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradientMode {
    /// Finite differences under nearest-neighbour interpolation, where the
    /// cost is piecewise constant. Analytic otherwise, with finite
    /// differences when the analytic gradient vanishes exactly.
    #[default]
    Auto,
    /// Chain rule through the moving Parzen window.
    Analytic,
    /// Central differences of the metric value, one step per parameter.
    FiniteDifference,
}

/// One fixed sample seen through the current transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub fixed_value: f64,
    pub moving_value: f64,
    /// `∇M(T(x))ᵀ · ∂T/∂μ`: change of the moving intensity per parameter.
    pub moving_jacobian: RigidParameters,
}

/// Mattes mutual information metric.
///
/// Intensity ranges are taken once from the full images. Both images must
/// be `Float32` and finite; the registration engine performs the cast.
///
/// Binary images put every intensity on a bin center, where the moving
/// window derivatives cancel and the analytic gradient is zero. Nearest
/// neighbour interpolation has the same problem everywhere, since its
/// cost only changes when a sample jumps to another voxel. Both cases use
/// central differences whose steps move the image by about one voxel.
#[derive(Debug, Clone)]
pub struct MattesMutualInformation<'a> {
    moving: &'a Volume,
    moving_values: &'a [f32],
    fixed_binning: IntensityBinning,
    moving_binning: IntensityBinning,
    interpolator: InterpolationMode,
    minimum_valid_fraction: f64,
    gradient_mode: GradientMode,
    difference_steps: RigidParameters,
}

impl<'a> MattesMutualInformation<'a> {
    pub fn new(
        fixed: &Volume,
        moving: &'a Volume,
        num_bins: usize,
        interpolator: InterpolationMode,
    ) -> Result<Self> {
        fixed.require_pixel_type(PixelType::Float32)?;
        let moving_values = moving.as_slice::<f32>()?;
        if num_bins < MIN_BINS {
            return Err(RegistrationError::invalid_configuration(format!(
                "Mattes mutual information needs at least {} bins, got {}",
                MIN_BINS, num_bins
            )));
        }
        validate_finite_intensities(fixed, "Fixed")?;
        validate_finite_intensities(moving, "Moving")?;
        let (fixed_min, fixed_max) = fixed.min_max();
        let (moving_min, moving_max) = moving.min_max();
        Ok(Self {
            moving,
            moving_values,
            fixed_binning: IntensityBinning::new(fixed_min, fixed_max, num_bins),
            moving_binning: IntensityBinning::new(moving_min, moving_max, num_bins),
            interpolator,
            minimum_valid_fraction: 1.0 / 16.0,
            gradient_mode: GradientMode::Auto,
            difference_steps: default_difference_steps(fixed.geometry()),
        })
    }

    /// Fraction of the sample set that must map inside the moving image.
    pub fn with_minimum_valid_fraction(mut self, fraction: f64) -> Self {
        self.minimum_valid_fraction = fraction;
        self
    }

    pub fn with_gradient_mode(mut self, mode: GradientMode) -> Self {
        self.gradient_mode = mode;
        self
    }

    /// Per-parameter steps of the central differences.
    pub fn with_difference_steps(mut self, steps: RigidParameters) -> Self {
        self.difference_steps = steps;
        self
    }

    pub fn gradient_mode(&self) -> GradientMode {
        self.gradient_mode
    }

    pub fn difference_steps(&self) -> &RigidParameters {
        &self.difference_steps
    }

    pub fn fixed_binning(&self) -> &IntensityBinning {
        &self.fixed_binning
    }

    pub fn moving_binning(&self) -> &IntensityBinning {
        &self.moving_binning
    }

    /// Smallest number of valid correspondences accepted for `sample_count` samples.
    pub fn required_samples(&self, sample_count: usize) -> usize {
        ((sample_count as f64 * self.minimum_valid_fraction).ceil() as usize).max(1)
    }

    /// Map every sample into the moving image, dropping those that fall outside.
    pub fn gather(&self, transform: &RigidTransform, samples: &SampleSet) -> Vec<Correspondence> {
        self.correspond(transform, samples, true)
    }

    /// Metric value alone, without any gradient work.
    pub fn value(&self, transform: &RigidTransform, samples: &SampleSet) -> Result<f64> {
        let correspondences = self.correspond(transform, samples, false);
        self.check_valid(correspondences.len(), samples.len())?;
        Ok(estimate_value(&correspondences, &self.fixed_binning, &self.moving_binning))
    }

    /// Gradient by central differences of [`Self::value`] around the
    /// parameters of `transform`.
    pub fn finite_difference_gradient(
        &self,
        transform: &RigidTransform,
        samples: &SampleSet,
    ) -> Result<RigidParameters> {
        let parameters = transform.parameters();
        let mut gradient = RigidParameters::zeros();
        for k in 0..gradient.len() {
            let step = self.difference_steps[k];
            let mut forward = parameters;
            let mut backward = parameters;
            forward[k] += step;
            backward[k] -= step;
            let up = self.value(&transform.with_parameters(&forward), samples)?;
            let down = self.value(&transform.with_parameters(&backward), samples)?;
            gradient[k] = (up - down) / (2.0 * step);
        }
        Ok(gradient)
    }

    fn uses_finite_differences(&self) -> bool {
        match self.gradient_mode {
            GradientMode::Auto => self.interpolator == InterpolationMode::NearestNeighbor,
            GradientMode::Analytic => false,
            GradientMode::FiniteDifference => true,
        }
    }

    fn check_valid(&self, valid: usize, sample_count: usize) -> Result<()> {
        let required = self.required_samples(sample_count);
        if valid < required {
            return Err(RegistrationError::DegenerateSamples { valid, required });
        }
        Ok(())
    }

    fn correspond(&self, transform: &RigidTransform, samples: &SampleSet, derivatives: bool) -> Vec<Correspondence> {
        let geometry = self.moving.geometry();
        let size = geometry.size();
        samples
            .points()
            .par_iter()
            .zip(samples.fixed_values().par_iter())
            .with_min_len(MIN_SAMPLES_PER_JOB)
            .filter_map(|(point, &fixed_value)| {
                let mapped = transform.transform_point(point);
                let index = geometry.physical_to_continuous_index(&mapped);
                let moving_value = self.interpolator.evaluate(self.moving_values, size, &index)?;
                let moving_jacobian = if derivatives {
                    transform.jacobian(point).transpose() * self.moving_gradient(&index).0
                } else {
                    RigidParameters::zeros()
                };
                Some(Correspondence {
                    fixed_value,
                    moving_value,
                    moving_jacobian,
                })
            })
            .collect()
    }

    /// Physical-space gradient of the moving image by central differences
    /// of the interpolator, one voxel either side. Axes whose neighbours
    /// fall outside contribute zero.
    fn moving_gradient(&self, index: &Point3) -> Vector3 {
        let geometry = self.moving.geometry();
        let size = geometry.size();
        let mut gradient = Vector3::zeros();
        for axis in 0..3 {
            let mut plus = *index;
            let mut minus = *index;
            plus[axis] += 1.0;
            minus[axis] -= 1.0;
            let (Some(vp), Some(vm)) = (
                self.interpolator.evaluate(self.moving_values, size, &plus),
                self.interpolator.evaluate(self.moving_values, size, &minus),
            ) else {
                continue;
            };
            let derivative = (vp - vm) / (2.0 * geometry.spacing()[axis]);
            gradient = gradient + geometry.direction().axis(axis) * derivative;
        }
        gradient
    }
}

/// Steps that move the far corners of `geometry` by about one voxel when
/// rotating about its center, and translate by one voxel.
fn default_difference_steps(geometry: &ImageGeometry) -> RigidParameters {
    let shift = geometry.spacing().min_component();
    let center = geometry.geometric_center();
    let radius = geometry
        .corners()
        .iter()
        .map(|corner| corner.distance(&center))
        .fold(0.0, f64::max);
    let angle = if radius > f64::EPSILON { shift / radius } else { shift };
    RigidParameters::from([angle, angle, angle, shift, shift, shift])
}

impl Metric for MattesMutualInformation<'_> {
    fn evaluate(&self, transform: &RigidTransform, samples: &SampleSet) -> Result<MetricEvaluation> {
        if self.uses_finite_differences() {
            let correspondences = self.correspond(transform, samples, false);
            self.check_valid(correspondences.len(), samples.len())?;
            return Ok(MetricEvaluation {
                value: estimate_value(&correspondences, &self.fixed_binning, &self.moving_binning),
                gradient: self.finite_difference_gradient(transform, samples)?,
                valid_samples: correspondences.len(),
            });
        }

        let correspondences = self.gather(transform, samples);
        self.check_valid(correspondences.len(), samples.len())?;
        let mut evaluation = estimate(&correspondences, &self.fixed_binning, &self.moving_binning);
        if self.gradient_mode == GradientMode::Auto && evaluation.gradient.iter().all(|g| *g == 0.0) {
            tracing::debug!("Analytic gradient vanished, using finite differences");
            evaluation.gradient = self.finite_difference_gradient(transform, samples)?;
        }
        Ok(evaluation)
    }

    fn name(&self) -> &'static str {
        "MattesMutualInformation"
    }
}

fn parzen_windows(
    correspondences: &[Correspondence],
    fixed_binning: &IntensityBinning,
    moving_binning: &IntensityBinning,
) -> Vec<(ParzenWindow, ParzenWindow)> {
    correspondences
        .par_iter()
        .map(|c| (fixed_binning.window(c.fixed_value), moving_binning.window(c.moving_value)))
        .collect()
}

/// Chunk length that depends only on `len`, so sums are grouped the same
/// way on every run and repeated evaluations agree bit for bit.
fn chunk_len(len: usize) -> usize {
    len.div_ceil(MAX_PARTIAL_HISTOGRAMS).max(MIN_SAMPLES_PER_JOB)
}

/// Joint histogram from per-chunk partial histograms merged in order.
fn accumulate(windows: &[(ParzenWindow, ParzenWindow)], bins: usize) -> JointHistogram {
    windows
        .par_chunks(chunk_len(windows.len()))
        .map(|chunk| {
            let mut h = JointHistogram::new(bins);
            for (wf, wm) in chunk {
                h.add(wf, wm);
            }
            h
        })
        .collect::<Vec<_>>()
        .into_iter()
        .fold(JointHistogram::new(bins), JointHistogram::merge)
}

/// Negative mutual information of a set of correspondences.
pub fn estimate_value(
    correspondences: &[Correspondence],
    fixed_binning: &IntensityBinning,
    moving_binning: &IntensityBinning,
) -> f64 {
    let windows = parzen_windows(correspondences, fixed_binning, moving_binning);
    -accumulate(&windows, fixed_binning.num_bins())
        .probabilities()
        .mutual_information()
}

/// Negative mutual information and its gradient from a set of correspondences.
///
/// The gradient follows the chain rule through the moving-axis Parzen window:
/// `∂MI/∂μ = 1/(N Δm) Σ_s Σ_ij B_f(i - f_s) B'_m(j - m_s) ln(p_ij / (p_i p_j)) ∂M_s/∂μ`.
pub fn estimate(
    correspondences: &[Correspondence],
    fixed_binning: &IntensityBinning,
    moving_binning: &IntensityBinning,
) -> MetricEvaluation {
    let bins = fixed_binning.num_bins();
    let windows = parzen_windows(correspondences, fixed_binning, moving_binning);
    let histogram = accumulate(&windows, bins);

    let probabilities = histogram.probabilities();
    let mutual_information = probabilities.mutual_information();
    if histogram.total() <= 0.0 {
        return MetricEvaluation {
            value: -mutual_information,
            gradient: RigidParameters::zeros(),
            valid_samples: correspondences.len(),
        };
    }

    let log_ratio = probabilities.log_ratio_table();
    let factor = 1.0 / (histogram.total() * moving_binning.bin_size());
    let chunk = chunk_len(windows.len());
    let derivative = windows
        .par_chunks(chunk)
        .zip(correspondences.par_chunks(chunk))
        .map(|(windows, correspondences)| {
            windows
                .iter()
                .zip(correspondences)
                .fold(RigidParameters::zeros(), |sum, ((wf, wm), c)| {
                    let mut weight = 0.0;
                    for (a, wfa) in wf.weights.iter().enumerate() {
                        if *wfa == 0.0 {
                            continue;
                        }
                        let row = (wf.start + a) * bins + wm.start;
                        for (b, dwm) in wm.derivatives.iter().enumerate() {
                            weight += wfa * dwm * log_ratio[row + b];
                        }
                    }
                    sum + c.moving_jacobian * weight
                })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .fold(RigidParameters::zeros(), |a, b| a + b);

    MetricEvaluation {
        value: -mutual_information,
        gradient: -(derivative * factor),
        valid_samples: correspondences.len(),
    }
}
