/*!
 * Execution Module
 * Task execution engines with timing and latency instrumentation
 */

pub mod engine;
pub mod latency;
pub mod timer;

pub use engine::ExecutionEngine;
pub use latency::{LatencyProbe, LatencySummary};
pub use timer::{TimeStats, Timer};
