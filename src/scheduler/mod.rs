/*!
 * Scheduler Module
 * Schedule policies and their binding to the OS scheduler
 */

pub mod policy;
pub mod realtime;

// Re-export public API
pub use policy::{RealtimePolicy, SchedulePolicy, TimingMode};
