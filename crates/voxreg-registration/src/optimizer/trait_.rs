//! Cost function trait driven by the optimizer.

use nalgebra::DVector;
use crate::error::Result;

/// An objective with a gradient.
///
/// `evaluate` takes `&mut self` so that stochastic costs may redraw their
/// samples between evaluations.
pub trait CostFunction {
    fn number_of_parameters(&self) -> usize;

    /// Value and gradient at `parameters`.
    fn evaluate(&mut self, parameters: &DVector<f64>) -> Result<(f64, DVector<f64>)>;
}
