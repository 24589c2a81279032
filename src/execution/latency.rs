/*!
 * Latency Chain Probe
 * End-to-end latency between a source task's update and a target task's update
 *
 * The source engine stamps the probe when its update starts; the target engine
 * closes the sample when its own update finishes. Samples land in a bounded
 * ring buffer, oldest overwritten first.
 */

use crate::core::limits::{LATENCY_REPORT_EVERY, LATENCY_WINDOW};
use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

struct ProbeState {
    started_at: Option<Instant>,
    samples: HeapRb<Duration>,
    recorded: u64,
}

/// Probe shared by the two ends of one latency chain
pub struct LatencyProbe {
    source: String,
    target: String,
    state: Mutex<ProbeState>,
}

impl LatencyProbe {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::with_window(source, target, LATENCY_WINDOW)
    }

    pub fn with_window(source: impl Into<String>, target: impl Into<String>, window: usize) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            state: Mutex::new(ProbeState {
                started_at: None,
                samples: HeapRb::new(window.max(1)),
                recorded: 0,
            }),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Source side: start a sample unless one is already open
    ///
    /// An open sample keeps its first stamp until the target closes it, so the
    /// latency runs from the oldest unconsumed source update.
    pub fn mark_source(&self) {
        self.state.lock().started_at.get_or_insert_with(Instant::now);
    }

    /// Target side: close the open sample, if any
    pub fn mark_target(&self) -> Option<Duration> {
        let (latency, report) = {
            let mut state = self.state.lock();
            let started = state.started_at.take()?;
            let latency = started.elapsed();
            state.samples.push_overwrite(latency);
            state.recorded += 1;
            (latency, state.recorded % LATENCY_REPORT_EVERY == 0)
        };

        if report {
            let summary = self.summary();
            info!(
                source = %self.source,
                target = %self.target,
                samples = summary.samples,
                mean_us = summary.mean.as_micros() as u64,
                min_us = summary.min.as_micros() as u64,
                max_us = summary.max.as_micros() as u64,
                "latency chain"
            );
        }

        Some(latency)
    }

    /// Summary over the samples currently in the window
    pub fn summary(&self) -> LatencySummary {
        let state = self.state.lock();
        let samples = state.samples.occupied_len();
        if samples == 0 {
            return LatencySummary::default();
        }

        let mut total = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;
        for &sample in state.samples.iter() {
            total += sample;
            min = min.min(sample);
            max = max.max(sample);
        }

        LatencySummary {
            samples,
            recorded: state.recorded,
            mean: total / samples as u32,
            min,
            max,
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.started_at = None;
        state.samples.clear();
        state.recorded = 0;
    }
}

impl std::fmt::Debug for LatencyProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyProbe")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Samples in the current window
    pub samples: usize,
    /// Samples recorded since creation or the last clear
    pub recorded: u64,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_without_source_records_nothing() {
        let probe = LatencyProbe::new("a", "b");
        assert!(probe.mark_target().is_none());
        assert_eq!(probe.summary().samples, 0);
    }

    #[test]
    fn test_one_sample_per_source_mark() {
        let probe = LatencyProbe::new("a", "b");
        probe.mark_source();
        assert!(probe.mark_target().is_some());
        assert!(probe.mark_target().is_none());

        let summary = probe.summary();
        assert_eq!(summary.samples, 1);
        assert_eq!(summary.recorded, 1);
        assert!(summary.min <= summary.max);
    }

    #[test]
    fn test_open_sample_keeps_first_stamp() {
        let probe = LatencyProbe::new("a", "b");
        probe.mark_source();
        std::thread::sleep(Duration::from_millis(20));
        probe.mark_source();

        let latency = probe.mark_target().unwrap();
        assert!(latency >= Duration::from_millis(20));
        assert_eq!(probe.summary().recorded, 1);
    }

    #[test]
    fn test_window_overwrites_oldest() {
        let probe = LatencyProbe::with_window("a", "b", 4);
        for _ in 0..10 {
            probe.mark_source();
            probe.mark_target();
        }

        let summary = probe.summary();
        assert_eq!(summary.samples, 4);
        assert_eq!(summary.recorded, 10);

        probe.clear();
        assert_eq!(probe.summary(), LatencySummary::default());
    }
}
