//! Optimizer module.
//!
//! Scaled gradient descent over a [`CostFunction`], with parameter scales
//! and step limits expressed as physical displacement.

pub mod trait_;
pub mod convergence;
pub mod scales;
pub mod gradient_descent;

pub use trait_::CostFunction;
pub use convergence::ConvergenceWindow;
pub use scales::{PhysicalShiftEstimator, ShiftEstimator, SMALL_PARAMETER_VARIATION};
pub use gradient_descent::{
    GradientDescent, GradientDescentConfig, LearningRateEstimation, OptimizationResult,
    OptimizerState, StopCondition,
};
