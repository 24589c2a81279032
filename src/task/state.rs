/*!
 * Task State
 * Lifecycle states of a task and their lock-free storage
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a task
///
/// `INIT -> IDLE -> (PRE_OPERATIONAL <-> IDLE)* -> RUNNING -> IDLE -> ... -> STOPPED`
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created, `on_config` not yet completed
    Init = 0,
    /// Draining pending operations
    PreOperational = 1,
    /// Inside the update hook
    Running = 2,
    /// Between steps
    Idle = 3,
    /// Terminal, reached from finalize only
    Stopped = 4,
}

impl TaskState {
    #[inline]
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TaskState::Init,
            1 => TaskState::PreOperational,
            2 => TaskState::Running,
            3 => TaskState::Idle,
            _ => TaskState::Stopped,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskState::Init => "INIT",
            TaskState::PreOperational => "PRE_OPERATIONAL",
            TaskState::Running => "RUNNING",
            TaskState::Idle => "IDLE",
            TaskState::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic cell holding a [`TaskState`]
///
/// Written by the activity thread, read by monitoring from any thread.
#[derive(Debug)]
pub struct AtomicTaskState(AtomicU8);

impl AtomicTaskState {
    pub const fn new(state: TaskState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn load(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, state: TaskState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for AtomicTaskState {
    fn default() -> Self {
        Self::new(TaskState::Init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip_through_atomic() {
        let cell = AtomicTaskState::default();
        assert_eq!(cell.load(), TaskState::Init);

        for state in [
            TaskState::PreOperational,
            TaskState::Running,
            TaskState::Idle,
            TaskState::Stopped,
        ] {
            cell.store(state);
            assert_eq!(cell.load(), state);
        }
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&TaskState::PreOperational).unwrap();
        assert_eq!(json, "\"pre_operational\"");
        assert_eq!(TaskState::PreOperational.to_string(), "PRE_OPERATIONAL");
    }
}
