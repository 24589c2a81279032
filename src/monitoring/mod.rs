/*!
 * Monitoring
 * Tracing setup, statistics reporting and read-only snapshots
 */

mod snapshot;
mod statistics;
mod tracer;

pub use snapshot::{reset_task_stats, ActivitySnapshot, GraphSnapshot, LatencySnapshot, TaskSnapshot};
pub use statistics::{log_statistics, StatisticsCommand, StatisticsTask};
pub use tracer::{init_tracing, TRACE_JSON_ENV};
