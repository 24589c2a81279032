/*!
 * rtgraph Kernel Library
 * Component runtime: activities, execution engines and the process-wide component registry
 */

pub mod activity;
pub mod core;
pub mod execution;
pub mod launcher;
pub mod monitoring;
pub mod registry;
pub mod scheduler;
pub mod task;

// Re-exports
pub use activity::{Activity, ExecutionMode, Runnable, TriggerGate};
pub use crate::core::errors::*;
pub use crate::core::types::*;
pub use execution::{ExecutionEngine, LatencyProbe, LatencySummary, TimeStats};
pub use launcher::{AppConfig, Launcher};
pub use monitoring::{init_tracing, log_statistics, GraphSnapshot, StatisticsTask};
pub use registry::{
    ComponentRegistry, ComponentSpec, DylibLoader, LibraryLoad, MergeOutcome, ModuleLoader, ModuleSlot, TaskRole,
    TypeSpec,
};
pub use scheduler::{RealtimePolicy, SchedulePolicy, TimingMode};
pub use task::{AsAny, Component, TaskContext, TaskState};
