/*!
 * Task Module
 * Task instances, their lifecycle state machine and pending-operation queue
 */

pub mod component;
pub mod context;
pub mod pending;
pub mod state;

pub use component::{AsAny, Component};
pub use context::TaskContext;
pub use pending::{PendingOp, PendingQueue};
pub use state::{AtomicTaskState, TaskState};
