/*!
 * Execution Timer
 * Per-task execution and service time accumulation
 *
 * `start()`/`stop()` bracket one update call. Elapsed time is the time spent
 * inside the bracket; service time is the distance between two consecutive
 * starts (the effective activation period).
 */

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Running sums for one task
#[derive(Debug, Clone)]
pub struct Timer {
    started_at: Option<Instant>,
    iterations: u64,
    elapsed: f64,
    elapsed_sq: f64,
    service: f64,
    service_sq: f64,
    min: Option<f64>,
    max: f64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            started_at: None,
            iterations: 0,
            elapsed: 0.0,
            elapsed_sq: 0.0,
            service: 0.0,
            service_sq: 0.0,
            min: None,
            max: 0.0,
        }
    }

    /// Open a measurement; accounts the service time since the previous start
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Close the measurement opened by `start()`
    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    pub(crate) fn start_at(&mut self, now: Instant) {
        if let Some(previous) = self.started_at {
            if self.iterations > 0 {
                let service = now.saturating_duration_since(previous).as_secs_f64();
                self.service += service;
                self.service_sq += service * service;
            }
        }
        self.started_at = Some(now);
        self.iterations += 1;
    }

    pub(crate) fn stop_at(&mut self, now: Instant) {
        let Some(started) = self.started_at else {
            return;
        };
        let time = now.saturating_duration_since(started).as_secs_f64();
        self.elapsed += time;
        self.elapsed_sq += time * time;
        self.min = Some(self.min.map_or(time, |m| m.min(time)));
        self.max = self.max.max(time);
    }

    /// Clear all accumulated statistics
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn stats(&self) -> TimeStats {
        let n = self.iterations as f64;
        let (mean, variance) = if self.iterations > 0 {
            let mean = self.elapsed / n;
            (mean, (self.elapsed_sq / n - mean * mean).max(0.0))
        } else {
            (0.0, 0.0)
        };

        let (service_mean, service_variance) = if self.iterations > 1 {
            let m = n - 1.0;
            let mean = self.service / m;
            (mean, (self.service_sq / m - mean * mean).max(0.0))
        } else {
            (0.0, 0.0)
        };

        TimeStats {
            iterations: self.iterations,
            total: self.elapsed,
            mean,
            variance,
            service_mean,
            service_variance,
            min: self.min.unwrap_or(0.0),
            max: self.max,
        }
    }
}

/// Snapshot of a task's timing statistics, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimeStats {
    pub iterations: u64,
    pub total: f64,
    pub mean: f64,
    pub variance: f64,
    pub service_mean: f64,
    pub service_variance: f64,
    pub min: f64,
    pub max: f64,
}

impl TimeStats {
    pub fn mean_duration(&self) -> Duration {
        Duration::from_secs_f64(self.mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_timer_has_zero_stats() {
        assert_eq!(Timer::new().stats(), TimeStats::default());
    }

    #[test]
    fn test_elapsed_and_service_time() {
        let mut timer = Timer::new();
        let t0 = Instant::now();

        // Two iterations of 2ms work, 10ms apart
        timer.start_at(t0);
        timer.stop_at(t0 + Duration::from_millis(2));
        timer.start_at(t0 + Duration::from_millis(10));
        timer.stop_at(t0 + Duration::from_millis(12));

        let stats = timer.stats();
        assert_eq!(stats.iterations, 2);
        assert!((stats.total - 0.004).abs() < 1e-9);
        assert!((stats.mean - 0.002).abs() < 1e-9);
        assert!(stats.variance < 1e-12);
        assert!((stats.service_mean - 0.010).abs() < 1e-9);
        assert!((stats.min - 0.002).abs() < 1e-9);
        assert!((stats.max - 0.002).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut timer = Timer::new();
        timer.start();
        timer.stop();
        timer.reset();
        assert_eq!(timer.iterations(), 0);
        assert_eq!(timer.stats(), TimeStats::default());
    }
}
