//! Random voxel sampling of the fixed image.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use voxreg_core::image::Volume;
use voxreg_core::spatial::Point3;
use crate::error::{RegistrationError, Result};

/// When the sample set is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingPolicy {
    /// Draw once before the first iteration and reuse it.
    #[default]
    FixedPerRun,
    /// Draw a fresh set for every metric evaluation.
    RedrawEachIteration,
}

/// Fixed-image voxel centres and their intensities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    points: Vec<Point3>,
    fixed_values: Vec<f64>,
}

impl SampleSet {
    pub fn new(points: Vec<Point3>, fixed_values: Vec<f64>) -> Self {
        debug_assert_eq!(points.len(), fixed_values.len());
        Self { points, fixed_values }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Physical sample positions in the fixed image.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn fixed_values(&self) -> &[f64] {
        &self.fixed_values
    }
}

/// Draws voxels uniformly at random, without replacement.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    percentage: f64,
    rng: StdRng,
}

impl RandomSampler {
    /// `percentage` is the fraction of fixed voxels per draw, in `(0, 1]`.
    pub fn new(percentage: f64, seed: u64) -> Result<Self> {
        if !(percentage > 0.0 && percentage <= 1.0) {
            return Err(RegistrationError::invalid_configuration(format!(
                "Sampling percentage must be in (0, 1], got {}",
                percentage
            )));
        }
        Ok(Self {
            percentage,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Samples drawn from an image of `total` voxels: at least one, at most all.
    pub fn sample_count(&self, total: usize) -> usize {
        ((total as f64 * self.percentage).floor() as usize).clamp(1, total.max(1))
    }

    /// Draw a sample set from `fixed`.
    pub fn draw(&mut self, fixed: &Volume) -> SampleSet {
        let geometry = fixed.geometry();
        let total = geometry.num_voxels();
        let count = self.sample_count(total);
        let mut offsets = index::sample(&mut self.rng, total, count).into_vec();
        // Storage order keeps later lookups cache friendly.
        offsets.sort_unstable();

        let mut points = Vec::with_capacity(count);
        let mut fixed_values = Vec::with_capacity(count);
        for offset in offsets {
            points.push(geometry.voxel_to_physical(geometry.voxel_index(offset)));
            fixed_values.push(fixed.data().value(offset).unwrap_or(0.0));
        }
        SampleSet::new(points, fixed_values)
    }
}
