//! Progress reporting and cooperative cancellation for registration runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Progress information for one optimizer iteration.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Current iteration number, starting at 1.
    pub iteration: usize,
    /// Iteration cap, if known.
    pub total_iterations: Option<usize>,
    /// Metric value at this iteration.
    pub value: f64,
    /// Time elapsed since start.
    pub elapsed: Duration,
    /// Estimated remaining time if the cap is reached.
    pub estimated_remaining: Option<Duration>,
    /// Learning rate used for the update.
    pub learning_rate: f64,
}

impl ProgressInfo {
    pub fn new(
        iteration: usize,
        total_iterations: Option<usize>,
        value: f64,
        elapsed: Duration,
        learning_rate: f64,
    ) -> Self {
        Self {
            iteration,
            total_iterations,
            value,
            elapsed,
            estimated_remaining: None,
            learning_rate,
        }
    }

    /// Calculate progress percentage.
    pub fn progress_percent(&self) -> Option<f64> {
        self.total_iterations
            .map(|total| (self.iteration as f64 / total as f64) * 100.0)
    }

    /// Calculate estimated remaining time.
    pub fn calculate_remaining(&mut self) {
        if let Some(total) = self.total_iterations {
            if self.iteration > 0 {
                let avg_time_per_iter = self.elapsed.as_secs_f64() / self.iteration as f64;
                let remaining_iters = total.saturating_sub(self.iteration);
                self.estimated_remaining = Some(Duration::from_secs_f64(
                    avg_time_per_iter * remaining_iters as f64,
                ));
            }
        }
    }
}

/// Progress callback trait for monitoring registration progress.
pub trait ProgressCallback: Send + Sync {
    /// Called at each iteration with progress information.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called when optimization starts.
    fn on_start(&self) {}

    /// Called when optimization stops without error.
    fn on_complete(&self, _info: &ProgressInfo) {}

    /// Called when optimization fails.
    fn on_error(&self, _error: &str) {}
}

/// Console progress callback that logs to tracing.
#[derive(Debug, Clone)]
pub struct ConsoleProgressCallback {
    /// Log interval (iterations).
    pub log_interval: usize,
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self { log_interval: 50 }
    }
}

impl ConsoleProgressCallback {
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
        }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.iteration % self.log_interval == 0 || info.total_iterations == Some(info.iteration) {
            let remaining = info
                .estimated_remaining
                .map(|d| format!("{:.2}s", d.as_secs_f64()))
                .unwrap_or_else(|| "N/A".to_string());

            tracing::info!(
                "Iter {}/{} ({:.1}%) | Metric: {:.6} | LR: {:.2e} | Elapsed: {:.2}s | ETA: {}",
                info.iteration,
                info.total_iterations.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string()),
                info.progress_percent().unwrap_or(0.0),
                info.value,
                info.learning_rate,
                info.elapsed.as_secs_f64(),
                remaining
            );
        }
    }

    fn on_start(&self) {
        tracing::info!("Optimization started");
    }

    fn on_complete(&self, info: &ProgressInfo) {
        tracing::info!(
            "Optimization finished in {:.2}s with best metric value {:.6}",
            info.elapsed.as_secs_f64(),
            info.value
        );
    }

    fn on_error(&self, error: &str) {
        tracing::error!("Optimization failed: {}", error);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// History callback that records all progress information.
#[derive(Debug, Clone, Default)]
pub struct HistoryCallback {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl HistoryCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the recorded history.
    pub fn get_history(&self) -> Vec<ProgressInfo> {
        lock(&self.history).clone()
    }

    pub fn clear(&self) {
        lock(&self.history).clear();
    }
}

impl ProgressCallback for HistoryCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        lock(&self.history).push(info.clone());
    }
}

/// Shared flag checked by the optimizer once per iteration.
///
/// Clones share the flag, so a token handed to the engine can be cancelled
/// from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Progress tracker that fans out to registered callbacks.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    start_time: Arc<Mutex<Option<Instant>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    fn elapsed(&self) -> Duration {
        let start = *lock(&self.start_time);
        start.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    pub fn start(&self) {
        *lock(&self.start_time) = Some(Instant::now());
        for callback in &self.callbacks {
            callback.on_start();
        }
    }

    pub fn update(&self, iteration: usize, total_iterations: Option<usize>, value: f64, learning_rate: f64) {
        let mut info = ProgressInfo::new(iteration, total_iterations, value, self.elapsed(), learning_rate);
        info.calculate_remaining();
        for callback in &self.callbacks {
            callback.on_progress(&info);
        }
    }

    pub fn complete(&self, best_value: f64, learning_rate: f64) {
        let info = ProgressInfo::new(0, None, best_value, self.elapsed(), learning_rate);
        for callback in &self.callbacks {
            callback.on_complete(&info);
        }
    }

    pub fn error(&self, error: &str) {
        for callback in &self.callbacks {
            callback.on_error(error);
        }
    }
}
