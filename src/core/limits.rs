/*!
 * Runtime Limits and Constants
 *
 * Centralized location for runtime-wide thresholds and magic numbers.
 */

use std::time::Duration;

// =============================================================================
// ACTIVITY
// =============================================================================

/// Prefix for dedicated activity thread names ("activity-<id>")
pub const ACTIVITY_THREAD_PREFIX: &str = "activity";

/// Exit code used when a dedicated activity cannot obtain its requested
/// real-time scheduling attributes
pub const REALTIME_FATAL_EXIT_CODE: i32 = 70;

/// Nanoseconds per millisecond, for deadline scheduling conversion
pub const NANOS_PER_MILLI: u64 = 1_000_000;

// =============================================================================
// PROFILING
// =============================================================================

/// Rolling latency sample window per latency chain
pub const LATENCY_WINDOW: usize = 256;

/// Emit a latency summary every N recorded samples
pub const LATENCY_REPORT_EVERY: u64 = 10;

/// Default interval for the statistics reporter
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(5);

// =============================================================================
// MODULES
// =============================================================================

/// Exported accessor symbol every component module provides
pub const MODULE_SLOT_SYMBOL: &str = "rtgraph_module_slot";
