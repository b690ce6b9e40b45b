//! Rigid registration for voxreg volumes.
//!
//! Sampled Mattes mutual information driven by scaled gradient descent,
//! with a centered initializer and a final resample onto the fixed grid.
//!
//! ```no_run
//! use voxreg_registration::{RegistrationConfig, RegistrationEngine};
//! # fn run(moving: &voxreg_core::Volume, fixed: &voxreg_core::Volume) -> voxreg_registration::Result<()> {
//! let engine = RegistrationEngine::new(RegistrationConfig::default().with_seed(42));
//! let outcome = engine.register(moving, fixed)?;
//! println!("{:?} {:?}", outcome.stop_condition, outcome.transform.parameters());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod validation;
pub mod progress;
pub mod metric;
pub mod optimizer;
pub mod registration;
pub mod pipeline;

pub use error::{RegistrationError, Result};
pub use progress::{CancellationToken, ConsoleProgressCallback, HistoryCallback, ProgressCallback, ProgressInfo, ProgressTracker};
pub use metric::{GradientMode, MattesMutualInformation, Metric, MetricEvaluation, SamplingPolicy};
pub use optimizer::{GradientDescent, GradientDescentConfig, LearningRateEstimation, StopCondition};
pub use registration::{RegistrationConfig, RegistrationEngine, RegistrationOutcome, INTERNAL_PIXEL_TYPE};
pub use pipeline::align_to_reference;
