/*!
 * Activity Module
 * Assigns runnables to an execution strategy and drives them under a schedule policy
 *
 * One `Activity` type covers both strategies:
 * - `Inline`: no thread of its own; `start()` runs the drive loop on the caller
 * - `Dedicated`: one OS thread, spawned by `start()` and joined by `join()`
 */

mod drive;
pub mod runnable;
pub mod trigger;

pub use runnable::Runnable;
pub use trigger::TriggerGate;

use crate::core::errors::{ActivityError, ActivityResult};
use crate::core::limits::{ACTIVITY_THREAD_PREFIX, REALTIME_FATAL_EXIT_CODE};
use crate::core::types::ActivityId;
use crate::scheduler::{realtime, SchedulePolicy};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

static NEXT_ACTIVITY_ID: AtomicU32 = AtomicU32::new(0);

/// Execution strategy of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Runs on the thread calling `start()` (sequential activity)
    #[serde(alias = "sequential")]
    Inline,
    /// Owns one OS thread (parallel activity)
    #[default]
    #[serde(alias = "parallel")]
    Dedicated,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Inline => f.write_str("inline"),
            ExecutionMode::Dedicated => f.write_str("dedicated"),
        }
    }
}

/// Scheduling entity driving a fixed list of runnables
pub struct Activity {
    id: ActivityId,
    mode: ExecutionMode,
    policy: Arc<SchedulePolicy>,
    gate: Arc<TriggerGate>,
    runnables: RwLock<Vec<Arc<dyn Runnable>>>,
    launched: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: Mutex<Option<ThreadId>>,
}

impl Activity {
    pub fn new(policy: SchedulePolicy, mode: ExecutionMode) -> Self {
        let id = NEXT_ACTIVITY_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Activity {} created: mode={}, periodic={}, period={}ms",
            id,
            mode,
            policy.is_periodic(),
            policy.period_ms
        );

        Self {
            id,
            mode,
            policy: Arc::new(policy),
            gate: Arc::new(TriggerGate::new()),
            runnables: RwLock::new(Vec::new()),
            launched: AtomicBool::new(false),
            thread: Mutex::new(None),
            thread_id: Mutex::new(None),
        }
    }

    /// Sequential activity (runs on the caller's thread)
    pub fn inline(policy: SchedulePolicy) -> Self {
        Self::new(policy, ExecutionMode::Inline)
    }

    /// Parallel activity (owns one OS thread)
    pub fn dedicated(policy: SchedulePolicy) -> Self {
        Self::new(policy, ExecutionMode::Dedicated)
    }

    #[inline]
    pub fn id(&self) -> ActivityId {
        self.id
    }

    #[inline]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    #[inline]
    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    #[inline]
    pub fn is_periodic(&self) -> bool {
        self.policy.is_periodic()
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.policy.period()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.gate.is_active()
    }

    /// Append a runnable; the list is frozen once the activity starts
    pub fn add_runnable(&self, runnable: Arc<dyn Runnable>) {
        if self.launched.load(Ordering::Acquire) {
            warn!(
                "Activity {}: runnable {} added after start is ignored until restart",
                self.id,
                runnable.label()
            );
        }
        self.runnables.write().push(runnable);
    }

    pub fn runnables(&self) -> Vec<Arc<dyn Runnable>> {
        self.runnables.read().clone()
    }

    /// Thread running the drive loop, once started
    pub fn thread_id(&self) -> Option<ThreadId> {
        *self.thread_id.lock()
    }

    /// Start driving the runnables
    ///
    /// Dedicated: spawns the thread, no-op if it was already spawned.
    /// Inline: runs the drive loop here and returns after `stop()`.
    pub fn start(&self) -> ActivityResult<()> {
        match self.mode {
            ExecutionMode::Dedicated => self.start_dedicated(),
            ExecutionMode::Inline => {
                self.start_inline();
                Ok(())
            }
        }
    }

    fn start_dedicated(&self) -> ActivityResult<()> {
        let mut slot = self.thread.lock();
        if slot.is_some() || self.launched.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.gate.arm();

        let id = self.id;
        let policy = Arc::clone(&self.policy);
        let gate = Arc::clone(&self.gate);
        let runnables = self.runnables();

        let handle = thread::Builder::new()
            .name(format!("{}-{}", ACTIVITY_THREAD_PREFIX, id))
            .spawn(move || {
                if let Err(e) = realtime::apply(&policy, id) {
                    error!("Activity {}: {}", id, e);
                    std::process::exit(REALTIME_FATAL_EXIT_CODE);
                }
                drive::run(ExecutionMode::Dedicated, &policy, &gate, &runnables);
            })
            .map_err(|e| {
                self.gate.set_inactive();
                self.launched.store(false, Ordering::Release);
                ActivityError::SpawnFailed {
                    id,
                    reason: e.to_string(),
                }
            })?;

        *self.thread_id.lock() = Some(handle.thread().id());
        *slot = Some(handle);
        info!("Activity {} started on dedicated thread", id);
        Ok(())
    }

    fn start_inline(&self) {
        self.arm_inline();
        self.drive_inline();
    }

    /// Mark an inline activity active so that `stop()` is honoured from here on
    pub(crate) fn arm_inline(&self) {
        self.launched.store(true, Ordering::Release);
        self.gate.arm();
        *self.thread_id.lock() = Some(thread::current().id());
    }

    /// Run the drive loop of an armed inline activity until it is stopped
    pub(crate) fn drive_inline(&self) {
        let runnables = self.runnables();
        info!("Activity {} running inline", self.id);
        drive::run(ExecutionMode::Inline, &self.policy, &self.gate, &runnables);
    }

    /// Request a cooperative stop
    ///
    /// Never interrupts a running step. An inline periodic activity observes
    /// the request only after its current sleep, i.e. within one period.
    pub fn stop(&self) {
        match self.mode {
            ExecutionMode::Dedicated => {
                if self.thread.lock().is_some() {
                    debug!("Stopping activity {}", self.id);
                    self.gate.request_stop();
                }
            }
            ExecutionMode::Inline => {
                if self.gate.is_active() {
                    debug!("Stopping activity {}", self.id);
                    self.gate.request_stop();
                }
            }
        }
    }

    /// Wake a triggered activity for one more pass; ignored for periodic ones
    pub fn trigger(&self) {
        if self.is_periodic() {
            return;
        }
        self.gate.trigger();
    }

    /// Cancel one pending trigger, if any
    pub fn remove_trigger(&self) {
        self.gate.remove_trigger();
    }

    /// Wait for the dedicated thread to exit (after every finalize)
    pub fn join(&self) -> ActivityResult<()> {
        let handle = self.thread.lock().take();
        let Some(handle) = handle else {
            return Ok(());
        };

        handle.join().map_err(|_| {
            error!("Activity {} thread panicked", self.id);
            ActivityError::Panicked(self.id)
        })
    }
}

impl fmt::Debug for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activity")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("policy", &*self.policy)
            .field("active", &self.is_active())
            .field("runnables", &self.runnables.read().len())
            .finish()
    }
}

impl Drop for Activity {
    fn drop(&mut self) {
        if let Some(handle) = self.thread.get_mut().take() {
            self.gate.request_stop();
            let _ = handle.join();
        }
    }
}
