//! Parzen-windowed joint histogram for Mattes mutual information.
//!
//! Intensities are mapped to continuous bin coordinates with two bins of
//! padding on each side, and every sample spreads unit mass over four
//! neighbouring bins per axis using the cubic B-spline kernel.

/// Bins reserved on each side of the intensity range for kernel support.
pub const BIN_PADDING: usize = 2;

/// Smallest bin count that leaves at least one interior bin.
pub const MIN_BINS: usize = 2 * BIN_PADDING + 1;

/// Cubic B-spline kernel, support `(-2, 2)`, integrating to one.
#[inline]
pub fn cubic_bspline(u: f64) -> f64 {
    let a = u.abs();
    if a < 1.0 {
        (4.0 - 6.0 * a * a + 3.0 * a * a * a) / 6.0
    } else if a < 2.0 {
        let t = 2.0 - a;
        t * t * t / 6.0
    } else {
        0.0
    }
}

/// Derivative of [`cubic_bspline`].
#[inline]
pub fn cubic_bspline_derivative(u: f64) -> f64 {
    let a = u.abs();
    if a < 1.0 {
        -2.0 * u + 1.5 * u * a
    } else if a < 2.0 {
        let t = 2.0 - a;
        -u.signum() * t * t / 2.0
    } else {
        0.0
    }
}

/// Kernel weights of one sample on four consecutive bins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParzenWindow {
    /// First of the four bins.
    pub start: usize,
    /// `B(bin - term)` for each bin.
    pub weights: [f64; 4],
    /// `dB(bin - term) / d(term)` for each bin.
    pub derivatives: [f64; 4],
}

/// Maps intensities of one image to continuous bin coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityBinning {
    num_bins: usize,
    min: f64,
    max: f64,
    bin_size: f64,
    normalized_min: f64,
}

impl IntensityBinning {
    /// Binning for intensities in `[min, max]`. A zero-width range is widened
    /// by one so that constant images still get a valid bin size.
    /// `num_bins` must be at least [`MIN_BINS`].
    pub fn new(min: f64, max: f64, num_bins: usize) -> Self {
        let max = if max > min { max } else { min + 1.0 };
        let interior = num_bins.saturating_sub(2 * BIN_PADDING).max(1) as f64;
        let bin_size = (max - min) / interior;
        Self {
            num_bins,
            min,
            max,
            bin_size,
            normalized_min: min / bin_size - BIN_PADDING as f64,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn bin_size(&self) -> f64 {
        self.bin_size
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Continuous bin coordinate of `value`; `min` maps to `BIN_PADDING`.
    #[inline]
    pub fn term(&self, value: f64) -> f64 {
        value / self.bin_size - self.normalized_min
    }

    /// Parzen window of `value`.
    #[inline]
    pub fn window(&self, value: f64) -> ParzenWindow {
        let term = self.term(value);
        let last = (self.num_bins - BIN_PADDING - 1) as f64;
        let index = term.floor().clamp(BIN_PADDING as f64, last) as usize;
        let start = index - 1;
        let mut weights = [0.0; 4];
        let mut derivatives = [0.0; 4];
        for k in 0..4 {
            let arg = (start + k) as f64 - term;
            weights[k] = cubic_bspline(arg);
            // d/dterm of B(bin - term)
            derivatives[k] = -cubic_bspline_derivative(arg);
        }
        ParzenWindow { start, weights, derivatives }
    }
}

/// Unnormalized joint histogram, `fixed` bins along rows.
#[derive(Debug, Clone, PartialEq)]
pub struct JointHistogram {
    num_bins: usize,
    counts: Vec<f64>,
    total: f64,
}

impl JointHistogram {
    pub fn new(num_bins: usize) -> Self {
        Self {
            num_bins,
            counts: vec![0.0; num_bins * num_bins],
            total: 0.0,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Sum of all contributions; equals the number of added samples.
    pub fn total(&self) -> f64 {
        self.total
    }

    #[inline]
    pub fn get(&self, fixed_bin: usize, moving_bin: usize) -> f64 {
        self.counts[fixed_bin * self.num_bins + moving_bin]
    }

    /// Spread one sample over the 4 x 4 bins of its two windows.
    #[inline]
    pub fn add(&mut self, fixed: &ParzenWindow, moving: &ParzenWindow) {
        for (a, wf) in fixed.weights.iter().enumerate() {
            if *wf == 0.0 {
                continue;
            }
            let row = (fixed.start + a) * self.num_bins + moving.start;
            for (b, wm) in moving.weights.iter().enumerate() {
                self.counts[row + b] += wf * wm;
            }
        }
        self.total += fixed.weights.iter().sum::<f64>() * moving.weights.iter().sum::<f64>();
    }

    /// Combine two partial histograms.
    pub fn merge(mut self, other: Self) -> Self {
        for (a, b) in self.counts.iter_mut().zip(other.counts.iter()) {
            *a += b;
        }
        self.total += other.total;
        self
    }

    /// Normalize into joint and marginal probabilities.
    pub fn probabilities(&self) -> JointProbabilities {
        let n = self.num_bins;
        let scale = if self.total > 0.0 { 1.0 / self.total } else { 0.0 };
        let joint: Vec<f64> = self.counts.iter().map(|c| c * scale).collect();
        let mut fixed = vec![0.0; n];
        let mut moving = vec![0.0; n];
        for i in 0..n {
            for j in 0..n {
                let p = joint[i * n + j];
                fixed[i] += p;
                moving[j] += p;
            }
        }
        JointProbabilities { num_bins: n, joint, fixed, moving }
    }
}

/// Joint and marginal probability tables.
#[derive(Debug, Clone)]
pub struct JointProbabilities {
    num_bins: usize,
    joint: Vec<f64>,
    fixed: Vec<f64>,
    moving: Vec<f64>,
}

fn entropy<'a>(p: impl Iterator<Item = &'a f64>) -> f64 {
    -p.filter(|&&v| v > 0.0).map(|v| v * v.ln()).sum::<f64>()
}

impl JointProbabilities {
    #[inline]
    pub fn joint(&self, i: usize, j: usize) -> f64 {
        self.joint[i * self.num_bins + j]
    }

    pub fn fixed_marginal(&self) -> &[f64] {
        &self.fixed
    }

    pub fn moving_marginal(&self) -> &[f64] {
        &self.moving
    }

    pub fn fixed_entropy(&self) -> f64 {
        entropy(self.fixed.iter())
    }

    pub fn moving_entropy(&self) -> f64 {
        entropy(self.moving.iter())
    }

    pub fn joint_entropy(&self) -> f64 {
        entropy(self.joint.iter())
    }

    /// `H(fixed) + H(moving) - H(joint)`.
    pub fn mutual_information(&self) -> f64 {
        self.fixed_entropy() + self.moving_entropy() - self.joint_entropy()
    }

    /// `ln(p(i, j) / (p_f(i) p_m(j)))`, zero where `p(i, j)` vanishes.
    pub fn log_ratio_table(&self) -> Vec<f64> {
        let n = self.num_bins;
        let mut table = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                let p = self.joint[i * n + j];
                let denom = self.fixed[i] * self.moving[j];
                if p > 0.0 && denom > 0.0 {
                    table[i * n + j] = (p / denom).ln();
                }
            }
        }
        table
    }
}
