//! Scaled gradient descent with windowed convergence.

use std::sync::Arc;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use crate::error::{RegistrationError, Result};
use crate::progress::{CancellationToken, ProgressCallback, ProgressTracker};
use super::convergence::ConvergenceWindow;
use super::scales::ShiftEstimator;
use super::trait_::CostFunction;

/// When the learning rate is re-estimated from the physical step limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearningRateEstimation {
    /// Always use the configured learning rate.
    Never,
    /// Estimate on the first iteration and keep it.
    #[default]
    Once,
    /// Estimate on every iteration.
    EachIteration,
}

/// Gradient descent settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientDescentConfig {
    pub learning_rate: f64,
    pub number_of_iterations: usize,
    pub convergence_minimum_value: f64,
    pub convergence_window_size: usize,
    pub learning_rate_estimation: LearningRateEstimation,
    /// Largest displacement one update may cause. `None` lets the caller
    /// pick a default (the registration engine uses the minimum fixed spacing);
    /// without one the learning rate is never estimated or limited.
    pub maximum_step_size_in_physical_units: Option<f64>,
    /// Learning-rate multiplier applied whenever a step makes the value
    /// worse; the step is then retried from the last accepted parameters.
    /// `1.0` accepts every step.
    pub relaxation_factor: f64,
}

impl Default for GradientDescentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 3.0,
            number_of_iterations: 10_000,
            convergence_minimum_value: 1e-6,
            convergence_window_size: 10,
            learning_rate_estimation: LearningRateEstimation::Once,
            maximum_step_size_in_physical_units: None,
            relaxation_factor: 0.5,
        }
    }
}

impl GradientDescentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_number_of_iterations(mut self, iterations: usize) -> Self {
        self.number_of_iterations = iterations;
        self
    }

    pub fn with_convergence_minimum_value(mut self, value: f64) -> Self {
        self.convergence_minimum_value = value;
        self
    }

    pub fn with_convergence_window_size(mut self, size: usize) -> Self {
        self.convergence_window_size = size;
        self
    }

    pub fn with_learning_rate_estimation(mut self, estimation: LearningRateEstimation) -> Self {
        self.learning_rate_estimation = estimation;
        self
    }

    pub fn with_maximum_step_size_in_physical_units(mut self, step: f64) -> Self {
        self.maximum_step_size_in_physical_units = Some(step);
        self
    }

    pub fn with_relaxation_factor(mut self, factor: f64) -> Self {
        self.relaxation_factor = factor;
        self
    }
}

/// Why the optimizer stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopCondition {
    /// The convergence window was full and flat.
    Converged,
    MaxIterationsReached,
    Cancelled,
}

/// Mutable state of one optimization run.
#[derive(Debug, Clone)]
pub struct OptimizerState {
    pub iteration: usize,
    /// Value at the last accepted parameters.
    pub current_value: f64,
    /// Estimated or configured rate, before relaxation.
    pub learning_rate: f64,
    /// Product of the relaxation factors applied so far.
    pub relaxation: f64,
    pub scales: DVector<f64>,
    pub window: ConvergenceWindow,
}

impl OptimizerState {
    /// Rate the next step is taken with.
    pub fn effective_learning_rate(&self) -> f64 {
        self.learning_rate * self.relaxation
    }
}

/// Last parameters whose value did not get worse, with their scaled gradient.
struct AcceptedPoint {
    parameters: DVector<f64>,
    value: f64,
    scaled_gradient: DVector<f64>,
}

/// Outcome of a run that did not fail.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Parameters with the lowest value seen.
    pub parameters: DVector<f64>,
    /// Lowest value seen, NaN when nothing was evaluated.
    pub best_value: f64,
    pub stop_condition: StopCondition,
    /// Number of cost evaluations.
    pub iterations: usize,
    /// Value of every evaluation, in order.
    pub value_history: Vec<f64>,
    /// Best value after every evaluation; never increases.
    pub best_value_history: Vec<f64>,
    pub scales: DVector<f64>,
    /// Effective learning rate of the last step.
    pub learning_rate: f64,
}

/// Gradient descent optimizer.
///
/// Each iteration evaluates the cost at the trial parameters. A trial that
/// is worse than the last accepted point is rejected: the learning rate is
/// relaxed and the step retried from the accepted point along its gradient.
/// Otherwise the trial is accepted and the next step is
/// `parameters -= learning_rate * gradient / scales`. The convergence window
/// records the accepted value of every iteration.
/// Non-finite values or gradients abort with [`RegistrationError::Diverged`].
pub struct GradientDescent {
    config: GradientDescentConfig,
    tracker: ProgressTracker,
    cancellation: CancellationToken,
}

impl GradientDescent {
    pub fn new(config: GradientDescentConfig) -> Self {
        Self {
            config,
            tracker: ProgressTracker::new(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &GradientDescentConfig {
        &self.config
    }

    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.tracker.add_callback(callback);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Minimize `cost` from `initial`. Scales come from `shift`, which also
    /// drives learning-rate estimation and the physical step limit.
    pub fn optimize<C, S>(&self, cost: &mut C, initial: DVector<f64>, shift: &S) -> Result<OptimizationResult>
    where
        C: CostFunction + ?Sized,
        S: ShiftEstimator + ?Sized,
    {
        if initial.len() != cost.number_of_parameters() {
            return Err(RegistrationError::invalid_configuration(format!(
                "Expected {} parameters, got {}",
                cost.number_of_parameters(),
                initial.len()
            )));
        }
        let scales = shift.estimate_scales(&initial);
        tracing::debug!("Parameter scales: {:?}", scales.as_slice());
        self.optimize_with_scales(cost, initial, scales, shift)
    }

    /// Minimize `cost` with explicit parameter scales.
    pub fn optimize_with_scales<C, S>(
        &self,
        cost: &mut C,
        initial: DVector<f64>,
        scales: DVector<f64>,
        shift: &S,
    ) -> Result<OptimizationResult>
    where
        C: CostFunction + ?Sized,
        S: ShiftEstimator + ?Sized,
    {
        let config = &self.config;
        let max_step = config.maximum_step_size_in_physical_units;
        let relax = config.relaxation_factor < 1.0;
        let mut parameters = initial;
        let mut last_valid = parameters.clone();
        let mut best_parameters = parameters.clone();
        let mut best_value = f64::INFINITY;
        let mut accepted: Option<AcceptedPoint> = None;
        let mut value_history = Vec::new();
        let mut best_value_history = Vec::new();
        let mut state = OptimizerState {
            iteration: 0,
            current_value: f64::NAN,
            learning_rate: config.learning_rate,
            relaxation: 1.0,
            scales,
            window: ConvergenceWindow::new(config.convergence_window_size),
        };
        let mut stop_condition = StopCondition::MaxIterationsReached;

        self.tracker.start();
        while state.iteration < config.number_of_iterations {
            if self.cancellation.is_cancelled() {
                tracing::info!("Optimization cancelled at iteration {}", state.iteration);
                stop_condition = StopCondition::Cancelled;
                break;
            }

            let (value, gradient) = match cost.evaluate(&parameters) {
                Ok(evaluation) => evaluation,
                Err(err) => {
                    self.tracker.error(&err.to_string());
                    return Err(err);
                }
            };
            if !value.is_finite() || gradient.iter().any(|g| !g.is_finite()) {
                let err = RegistrationError::diverged(
                    state.iteration,
                    last_valid.as_slice(),
                    format!("non-finite metric value {} or gradient", value),
                );
                self.tracker.error(&err.to_string());
                return Err(err);
            }
            last_valid.copy_from(&parameters);
            state.iteration += 1;
            value_history.push(value);

            if value < best_value {
                best_value = value;
                best_parameters.copy_from(&parameters);
            }
            best_value_history.push(best_value);

            let (point, rejected) = match accepted.take() {
                Some(point) if relax && value > point.value => {
                    state.relaxation *= config.relaxation_factor;
                    tracing::debug!(
                        "Iteration {}: value {:.6} is worse, relaxing learning rate to {:.6e}",
                        state.iteration,
                        value,
                        state.effective_learning_rate()
                    );
                    (point, true)
                }
                _ => {
                    let scaled_gradient = gradient.component_div(&state.scales);
                    (AcceptedPoint { parameters: parameters.clone(), value, scaled_gradient }, false)
                }
            };
            state.current_value = point.value;

            state.window.push(point.value);
            if state.window.has_converged(config.convergence_minimum_value) {
                tracing::info!(
                    "Converged after {} iterations, window spread below {:e}",
                    state.iteration,
                    config.convergence_minimum_value
                );
                stop_condition = StopCondition::Converged;
                self.tracker.update(
                    state.iteration,
                    Some(config.number_of_iterations),
                    value,
                    state.effective_learning_rate(),
                );
                break;
            }

            if let Some(max_step) = max_step.filter(|_| !rejected) {
                let estimate_now = match config.learning_rate_estimation {
                    LearningRateEstimation::Never => false,
                    LearningRateEstimation::Once => state.iteration == 1,
                    LearningRateEstimation::EachIteration => true,
                };
                if estimate_now {
                    let step_scale = shift.step_shift(&point.parameters, &point.scaled_gradient);
                    if step_scale > f64::EPSILON && step_scale.is_finite() {
                        state.learning_rate = max_step / step_scale;
                        tracing::debug!("Estimated learning rate {:.6e}", state.learning_rate);
                    }
                }
            }

            let mut step = -(&point.scaled_gradient * state.effective_learning_rate());
            if let Some(max_step) = max_step {
                let shift_size = shift.step_shift(&point.parameters, &step);
                if shift_size > max_step {
                    step *= max_step / shift_size;
                }
            }
            parameters = &point.parameters + step;
            accepted = Some(point);

            self.tracker.update(
                state.iteration,
                Some(config.number_of_iterations),
                value,
                state.effective_learning_rate(),
            );
        }

        if stop_condition == StopCondition::MaxIterationsReached {
            tracing::info!("Stopped after the maximum of {} iterations", config.number_of_iterations);
        }
        if value_history.is_empty() {
            best_value = f64::NAN;
        }
        self.tracker.complete(best_value, state.effective_learning_rate());

        Ok(OptimizationResult {
            parameters: best_parameters,
            best_value,
            stop_condition,
            iterations: state.iteration,
            value_history,
            best_value_history,
            learning_rate: state.effective_learning_rate(),
            scales: state.scales,
        })
    }
}
