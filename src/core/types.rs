/*!
 * Core Types
 * Common types used across the runtime
 */

/// Activity identifier (process-unique, monotonically increasing)
pub type ActivityId = u32;

/// CPU core index as reported by the OS
pub type CoreId = usize;

/// Real-time priority for FIFO / round-robin policies
pub type RtPriority = i32;

/// Nanosecond quantity used by deadline scheduling
pub type Nanos = u64;
