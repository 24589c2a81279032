/*!
 * Monitoring Snapshots
 * Serialisable read-only views of tasks, activities and the whole graph
 */

use crate::activity::{Activity, ExecutionMode};
use crate::core::types::ActivityId;
use crate::execution::{LatencySummary, TimeStats};
use crate::registry::{ComponentRegistry, TaskRole};
use crate::scheduler::SchedulePolicy;
use crate::task::{TaskContext, TaskState};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySnapshot {
    pub source: String,
    pub target: String,
    pub summary: LatencySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub name: String,
    pub class_name: String,
    pub role: TaskRole,
    pub state: TaskState,
    pub info: String,
    pub peers: Vec<String>,
    /// Present once the task is driven by an engine
    pub stats: Option<TimeStats>,
    pub latency: Vec<LatencySnapshot>,
}

impl TaskSnapshot {
    pub fn capture(task: &TaskContext) -> Self {
        let engine = task.engine();
        let latency = engine
            .as_ref()
            .map(|engine| {
                engine
                    .latency()
                    .iter()
                    .map(|probe| LatencySnapshot {
                        source: probe.source().to_string(),
                        target: probe.target().to_string(),
                        summary: probe.summary(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: task.instantiation_name().to_string(),
            class_name: task.class_name().to_string(),
            role: task.role(),
            state: task.state(),
            info: task.info(),
            peers: task
                .peers()
                .iter()
                .map(|peer| peer.instantiation_name().to_string())
                .collect(),
            stats: engine.map(|engine| engine.time_stats()),
            latency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub id: ActivityId,
    pub mode: ExecutionMode,
    pub active: bool,
    pub periodic: bool,
    pub period_ms: u64,
    pub policy: SchedulePolicy,
    /// Runnable labels in step order
    pub runnables: Vec<String>,
}

impl ActivitySnapshot {
    pub fn capture(activity: &Activity) -> Self {
        Self {
            id: activity.id(),
            mode: activity.mode(),
            active: activity.is_active(),
            periodic: activity.is_periodic(),
            period_ms: activity.period().as_millis() as u64,
            policy: activity.policy().clone(),
            runnables: activity
                .runnables()
                .iter()
                .map(|r| r.label().to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub components: Vec<String>,
    pub tasks: Vec<TaskSnapshot>,
    pub activities: Vec<ActivitySnapshot>,
    pub libraries: Vec<PathBuf>,
    pub profiling: bool,
    pub num_tasks: usize,
    pub config_completed: usize,
}

impl GraphSnapshot {
    pub fn capture(registry: &ComponentRegistry, activities: &[Arc<Activity>]) -> Self {
        let mut components: Vec<String> = registry.components().into_keys().collect();
        components.sort();

        let mut tasks: Vec<TaskSnapshot> = registry
            .tasks()
            .values()
            .map(|task| TaskSnapshot::capture(task))
            .collect();
        tasks.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            components,
            tasks,
            activities: activities.iter().map(|a| ActivitySnapshot::capture(a)).collect(),
            libraries: registry.libraries(),
            profiling: registry.profiling_enabled(),
            num_tasks: registry.num_tasks(),
            config_completed: registry.num_config_completed(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Clear a task's timing statistics without touching its state
///
/// False if the task is unknown or not driven by an engine.
pub fn reset_task_stats(registry: &ComponentRegistry, name: &str) -> bool {
    match registry.task(name).and_then(|task| task.engine()) {
        Some(engine) => {
            engine.reset_stats();
            true
        }
        None => false,
    }
}
