//! Metric implementations.
//!
//! Sampled Mattes mutual information: a random voxel subset of the fixed
//! image, a Parzen-windowed joint histogram and its gradient, analytic or
//! by finite differences.

pub mod trait_;
pub mod sampler;
pub mod histogram;
pub mod mattes;

pub use trait_::{Metric, MetricEvaluation};
pub use sampler::{RandomSampler, SampleSet, SamplingPolicy};
pub use histogram::{IntensityBinning, JointHistogram, JointProbabilities, ParzenWindow};
pub use mattes::{estimate, estimate_value, Correspondence, GradientMode, MattesMutualInformation};
