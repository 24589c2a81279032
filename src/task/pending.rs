/*!
 * Pending Operations
 * Commands enqueued from any thread and drained by the owning activity
 */

use super::component::Component;
use crossbeam_queue::SegQueue;
use std::fmt;

/// Deferred operation executed against the task's component
pub type PendingOp = Box<dyn FnOnce(&mut dyn Component) + Send>;

/// Lock-free MPSC-style queue of pending operations
#[derive(Default)]
pub struct PendingQueue {
    ops: SegQueue<PendingOp>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self {
            ops: SegQueue::new(),
        }
    }

    #[inline]
    pub fn push(&self, op: PendingOp) {
        self.ops.push(op);
    }

    #[inline]
    pub fn pop(&self) -> Option<PendingOp> {
        self.ops.pop()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

impl fmt::Debug for PendingQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingQueue")
            .field("len", &self.ops.len())
            .finish()
    }
}
