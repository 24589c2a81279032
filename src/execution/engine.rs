/*!
 * Execution Engine
 * Drives one task's lifecycle state machine on behalf of an activity
 */

use super::latency::LatencyProbe;
use super::timer::{TimeStats, Timer};
use crate::activity::Runnable;
use crate::registry::ComponentRegistry;
use crate::task::{TaskContext, TaskState};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Runnable adapter around one [`TaskContext`]
///
/// State machine per step:
/// `IDLE -> (PRE_OPERATIONAL -> IDLE)* -> RUNNING -> IDLE`; `finalize` ends in `STOPPED`.
pub struct ExecutionEngine {
    task: Arc<TaskContext>,
    registry: Arc<ComponentRegistry>,
    timer: Mutex<Timer>,
    sources: RwLock<Vec<Arc<LatencyProbe>>>,
    targets: RwLock<Vec<Arc<LatencyProbe>>>,
}

impl ExecutionEngine {
    /// Wrap `task` and bind the engine to it
    pub fn new(task: Arc<TaskContext>, registry: Arc<ComponentRegistry>) -> Arc<Self> {
        let engine = Arc::new(Self {
            task,
            registry,
            timer: Mutex::new(Timer::new()),
            sources: RwLock::new(Vec::new()),
            targets: RwLock::new(Vec::new()),
        });
        engine.task.bind_engine(&engine);
        engine
    }

    #[inline]
    pub fn task(&self) -> &Arc<TaskContext> {
        &self.task
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn time_stats(&self) -> TimeStats {
        self.timer.lock().stats()
    }

    /// Clear timing and latency statistics; the task state is left alone
    pub fn reset_stats(&self) {
        self.timer.lock().reset();
        for probe in self.sources.read().iter().chain(self.targets.read().iter()) {
            probe.clear();
        }
    }

    /// Measure latency from the start of `source`'s update to the end of `target`'s
    pub fn link_latency(source: &Arc<ExecutionEngine>, target: &Arc<ExecutionEngine>) -> Arc<LatencyProbe> {
        let probe = Arc::new(LatencyProbe::new(
            source.task.instantiation_name(),
            target.task.instantiation_name(),
        ));
        source.sources.write().push(Arc::clone(&probe));
        target.targets.write().push(Arc::clone(&probe));
        debug!(
            source = source.task.instantiation_name(),
            target = target.task.instantiation_name(),
            "latency chain linked"
        );
        probe
    }

    /// Every probe this engine takes part in, source side first
    pub fn latency(&self) -> Vec<Arc<LatencyProbe>> {
        self.sources
            .read()
            .iter()
            .chain(self.targets.read().iter())
            .cloned()
            .collect()
    }

    fn update(&self) {
        if !self.registry.profiling_enabled() {
            self.task.on_update();
            return;
        }

        for probe in self.sources.read().iter() {
            probe.mark_source();
        }

        self.timer.lock().start();
        self.task.on_update();
        self.timer.lock().stop();

        for probe in self.targets.read().iter() {
            probe.mark_target();
        }
    }
}

impl Runnable for ExecutionEngine {
    fn init(&self) {
        self.task.set_state(TaskState::Init);
        self.task.on_config();

        if !self.task.is_peer() && self.task.mark_configured() {
            self.registry.increase_config_completed();
        }

        self.task.set_state(TaskState::Idle);
        debug!(task = self.task.instantiation_name(), "configured");
    }

    fn step(&self) {
        while self.task.has_pending() {
            self.task.set_state(TaskState::PreOperational);
            self.task.step_pending();
            self.task.set_state(TaskState::Idle);
        }

        self.task.set_state(TaskState::Running);
        self.update();
        self.task.set_state(TaskState::Idle);
        trace!(task = self.task.instantiation_name(), "step");
    }

    fn finalize(&self) {
        if self.task.state() != TaskState::Stopped {
            self.task.stop();
        }
    }

    fn label(&self) -> &str {
        self.task.instantiation_name()
    }
}

impl fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("task", &self.task.instantiation_name())
            .field("state", &self.task.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TaskRole;
    use crate::task::Component;

    struct Probe {
        seen: Arc<Mutex<Vec<TaskState>>>,
        task: std::sync::Weak<TaskContext>,
    }

    impl Component for Probe {
        fn on_update(&mut self) {
            if let Some(task) = self.task.upgrade() {
                self.seen.lock().push(task.state());
            }
        }
    }

    #[test]
    fn test_update_runs_in_running_state() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let task = Arc::new_cyclic(|weak| {
            TaskContext::new(
                "probe",
                "Probe",
                TaskRole::Scheduled,
                Box::new(Probe {
                    seen: Arc::clone(&seen),
                    task: weak.clone(),
                }),
            )
        });
        let registry = Arc::new(ComponentRegistry::new());
        let engine = ExecutionEngine::new(Arc::clone(&task), Arc::clone(&registry));

        engine.init();
        assert_eq!(task.state(), TaskState::Idle);
        assert_eq!(registry.num_config_completed(), 1);

        engine.step();
        assert_eq!(*seen.lock(), vec![TaskState::Running]);
        assert_eq!(task.state(), TaskState::Idle);

        engine.finalize();
        assert_eq!(task.state(), TaskState::Stopped);
        assert!(task.engine().is_some());
    }

    #[test]
    fn test_init_counts_once() {
        struct Noop;
        impl Component for Noop {
            fn on_update(&mut self) {}
        }

        let registry = Arc::new(ComponentRegistry::new());
        let task = Arc::new(TaskContext::new("n", "Noop", TaskRole::Scheduled, Box::new(Noop)));
        let engine = ExecutionEngine::new(task, Arc::clone(&registry));

        engine.init();
        engine.init();
        assert_eq!(registry.num_config_completed(), 1);
    }
}
