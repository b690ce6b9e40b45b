//! Windowed convergence test.

use std::collections::VecDeque;

/// Trailing record of the last `size` metric values.
///
/// The optimization has converged once the window is full and the spread
/// `max - min` of the recorded values drops below a threshold.
#[derive(Debug, Clone)]
pub struct ConvergenceWindow {
    size: usize,
    values: VecDeque<f64>,
}

impl ConvergenceWindow {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            values: VecDeque::with_capacity(size),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Record a value, dropping the oldest once the window is full.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.size {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn is_full(&self) -> bool {
        self.values.len() >= self.size
    }

    /// `max - min` over the window, or `None` until it is full.
    pub fn spread(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        let (lo, hi) = self
            .values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(hi - lo)
    }

    pub fn has_converged(&self, minimum_value: f64) -> bool {
        self.spread().map_or(false, |s| s < minimum_value)
    }
}
