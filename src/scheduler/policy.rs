/*!
 * Schedule Policy
 * Declares how an activity is driven: timing mode, real-time class and CPU placement
 */

use crate::core::errors::{ScheduleError, ScheduleResult};
use crate::core::limits::NANOS_PER_MILLI;
use crate::core::types::{CoreId, Nanos, RtPriority};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Timing mode of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    /// Step every `period_ms`
    #[default]
    Periodic,
    /// Periodic with a mandatory real-time policy
    Hard,
    /// Step once per trigger
    Triggered,
}

/// OS scheduling class applied to a dedicated activity thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealtimePolicy {
    /// Leave the default (time-sharing) scheduler in place
    #[default]
    None,
    Fifo,
    RoundRobin,
    Deadline,
}

impl fmt::Display for RealtimePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RealtimePolicy::None => "none",
            RealtimePolicy::Fifo => "SCHED_FIFO",
            RealtimePolicy::RoundRobin => "SCHED_RR",
            RealtimePolicy::Deadline => "SCHED_DEADLINE",
        };
        f.write_str(name)
    }
}

/// Scheduling contract of one activity
///
/// Immutable once an [`Activity`](crate::activity::Activity) has been built from it.
/// For triggered activities every real-time field except the CPU placement is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SchedulePolicy {
    pub timing_mode: TimingMode,
    pub realtime: RealtimePolicy,
    pub period_ms: u64,
    pub priority: RtPriority,
    pub runtime_ns: Nanos,
    /// Relative deadline; zero means "equal to the period"
    pub deadline_ns: Nanos,
    pub affinity: Option<CoreId>,
    pub available_cores: BTreeSet<CoreId>,
}

impl SchedulePolicy {
    /// Periodic policy without real-time class
    pub fn periodic(period_ms: u64) -> Self {
        Self {
            timing_mode: TimingMode::Periodic,
            period_ms,
            ..Self::default()
        }
    }

    /// Hard periodic policy; a real-time class must be chosen before use
    pub fn hard(period_ms: u64) -> Self {
        Self {
            timing_mode: TimingMode::Hard,
            period_ms,
            ..Self::default()
        }
    }

    /// Event-driven policy
    pub fn triggered() -> Self {
        Self {
            timing_mode: TimingMode::Triggered,
            ..Self::default()
        }
    }

    pub fn fifo(mut self, priority: RtPriority) -> Self {
        self.realtime = RealtimePolicy::Fifo;
        self.priority = priority;
        self
    }

    pub fn round_robin(mut self, priority: RtPriority) -> Self {
        self.realtime = RealtimePolicy::RoundRobin;
        self.priority = priority;
        self
    }

    pub fn deadline(mut self, runtime_ns: Nanos, deadline_ns: Nanos) -> Self {
        self.realtime = RealtimePolicy::Deadline;
        self.runtime_ns = runtime_ns;
        self.deadline_ns = deadline_ns;
        self
    }

    pub fn with_affinity(mut self, core: CoreId) -> Self {
        self.affinity = Some(core);
        self
    }

    pub fn with_cores<I: IntoIterator<Item = CoreId>>(mut self, cores: I) -> Self {
        self.available_cores = cores.into_iter().collect();
        self
    }

    /// True unless the activity is triggered
    #[inline]
    pub fn is_periodic(&self) -> bool {
        self.timing_mode != TimingMode::Triggered
    }

    #[inline]
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Period in nanoseconds, as consumed by deadline scheduling
    #[inline]
    pub fn period_ns(&self) -> Nanos {
        self.period_ms.saturating_mul(NANOS_PER_MILLI)
    }

    /// Relative deadline, defaulting to the period
    pub fn effective_deadline_ns(&self) -> Nanos {
        if self.deadline_ns == 0 {
            self.period_ns()
        } else {
            self.deadline_ns
        }
    }

    /// Real-time class that actually applies (none for triggered activities)
    pub fn effective_realtime(&self) -> RealtimePolicy {
        if self.is_periodic() {
            self.realtime
        } else {
            RealtimePolicy::None
        }
    }

    /// Cores the activity thread should be pinned to
    ///
    /// The preferred `affinity` wins only if it belongs to `available_cores`;
    /// otherwise the whole available set is used. An empty result means the
    /// thread keeps the affinity it inherited.
    pub fn cpu_set(&self) -> Vec<CoreId> {
        match self.affinity {
            Some(core) if self.available_cores.contains(&core) => vec![core],
            Some(core) if self.available_cores.is_empty() => vec![core],
            _ => self.available_cores.iter().copied().collect(),
        }
    }

    /// Check internal consistency before an activity is built
    pub fn validate(&self) -> ScheduleResult<()> {
        if self.timing_mode == TimingMode::Hard && self.realtime == RealtimePolicy::None {
            return Err(ScheduleError::InvalidPolicy(
                "hard timing requires a real-time policy".into(),
            ));
        }

        if self.is_periodic() && self.realtime == RealtimePolicy::Deadline {
            if self.period_ms == 0 {
                return Err(ScheduleError::InvalidPolicy(
                    "deadline scheduling requires a non-zero period".into(),
                ));
            }
            let deadline = self.effective_deadline_ns();
            if self.runtime_ns == 0 || self.runtime_ns > deadline || deadline > self.period_ns() {
                return Err(ScheduleError::InvalidPolicy(format!(
                    "deadline scheduling requires 0 < runtime ({}) <= deadline ({}) <= period ({})",
                    self.runtime_ns,
                    deadline,
                    self.period_ns()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triggered_is_not_periodic() {
        assert!(SchedulePolicy::periodic(10).is_periodic());
        assert!(SchedulePolicy::hard(10).fifo(50).is_periodic());
        assert!(!SchedulePolicy::triggered().is_periodic());
    }

    #[test]
    fn test_triggered_ignores_realtime() {
        let policy = SchedulePolicy {
            realtime: RealtimePolicy::Fifo,
            ..SchedulePolicy::triggered()
        };
        assert_eq!(policy.effective_realtime(), RealtimePolicy::None);
    }

    #[test]
    fn test_cpu_set_prefers_available_affinity() {
        let policy = SchedulePolicy::periodic(5).with_cores([0, 1, 2]).with_affinity(1);
        assert_eq!(policy.cpu_set(), vec![1]);

        let policy = SchedulePolicy::periodic(5).with_cores([0, 2]).with_affinity(1);
        assert_eq!(policy.cpu_set(), vec![0, 2]);

        assert!(SchedulePolicy::periodic(5).cpu_set().is_empty());
    }

    #[test]
    fn test_hard_requires_realtime() {
        assert!(SchedulePolicy::hard(10).validate().is_err());
        assert!(SchedulePolicy::hard(10).round_robin(10).validate().is_ok());
    }

    #[test]
    fn test_deadline_validation() {
        let ok = SchedulePolicy::periodic(10).deadline(2_000_000, 0);
        assert!(ok.validate().is_ok());
        assert_eq!(ok.effective_deadline_ns(), 10_000_000);

        let too_long = SchedulePolicy::periodic(1).deadline(5_000_000, 0);
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let policy: SchedulePolicy =
            serde_json::from_str(r#"{"timing_mode":"periodic","period_ms":20,"realtime":"fifo","priority":40}"#)
                .unwrap();
        assert_eq!(policy.period(), Duration::from_millis(20));
        assert_eq!(policy.realtime, RealtimePolicy::Fifo);
        assert!(policy.available_cores.is_empty());
    }
}
