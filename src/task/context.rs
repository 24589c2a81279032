/*!
 * Task Context
 * A schedulable component instance: identity, lifecycle state, pending operations
 */

use super::component::{AsAny, Component};
use super::pending::{PendingOp, PendingQueue};
use super::state::{AtomicTaskState, TaskState};
use crate::execution::ExecutionEngine;
use crate::registry::TaskRole;
use log::debug;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// A live task instance
///
/// The component itself is only touched by the activity thread stepping the
/// task's engine; pending operations may be enqueued from any thread and are
/// drained at the start of every step.
pub struct TaskContext {
    name: String,
    class_name: String,
    role: TaskRole,
    state: AtomicTaskState,
    pending: PendingQueue,
    component: Mutex<Box<dyn Component>>,
    configured: AtomicBool,
    peers: RwLock<Vec<Arc<TaskContext>>>,
    engine: RwLock<Weak<ExecutionEngine>>,
}

impl TaskContext {
    pub fn new(
        name: impl Into<String>,
        class_name: impl Into<String>,
        role: TaskRole,
        component: Box<dyn Component>,
    ) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            role,
            state: AtomicTaskState::new(TaskState::Init),
            pending: PendingQueue::new(),
            component: Mutex::new(component),
            configured: AtomicBool::new(false),
            peers: RwLock::new(Vec::new()),
            engine: RwLock::new(Weak::new()),
        }
    }

    /// Process-unique instance name
    #[inline]
    pub fn instantiation_name(&self) -> &str {
        &self.name
    }

    /// Name of the ComponentSpec this task was created from
    #[inline]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[inline]
    pub fn role(&self) -> TaskRole {
        self.role
    }

    #[inline]
    pub fn is_peer(&self) -> bool {
        self.role == TaskRole::Peer
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        self.state.load()
    }

    #[inline]
    pub fn set_state(&self, state: TaskState) {
        self.state.store(state);
    }

    // =========================================================================
    // Pending operations
    // =========================================================================

    /// Queue an operation for the next step; callable from any thread
    pub fn enqueue<F>(&self, op: F)
    where
        F: FnOnce(&mut dyn Component) + Send + 'static,
    {
        self.pending.push(Box::new(op));
    }

    /// Queue an already boxed operation
    pub fn enqueue_boxed(&self, op: PendingOp) {
        self.pending.push(op);
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Execute one pending operation; false if the queue was empty
    pub fn step_pending(&self) -> bool {
        match self.pending.pop() {
            Some(op) => {
                let mut component = self.component.lock();
                op(&mut **component);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Hooks
    // =========================================================================

    pub fn on_config(&self) {
        self.component.lock().on_config();
    }

    pub fn on_update(&self) {
        self.component.lock().on_update();
    }

    /// Invoke the stop hook and enter the terminal state
    pub fn stop(&self) {
        self.component.lock().on_stop();
        self.set_state(TaskState::Stopped);
        debug!("[{}] stopped", self.name);
    }

    pub fn info(&self) -> String {
        self.component.lock().info()
    }

    /// Run `f` against the concrete component if it is a `T`
    pub fn with_component<T, R, F>(&self, f: F) -> Option<R>
    where
        T: Component,
        F: FnOnce(&mut T) -> R,
    {
        let mut component = self.component.lock();
        AsAny::as_any_mut(&mut **component).downcast_mut::<T>().map(f)
    }

    // =========================================================================
    // Configuration barrier bookkeeping
    // =========================================================================

    /// Record that `on_config` completed; true only the first time
    pub(crate) fn mark_configured(&self) -> bool {
        !self.configured.swap(true, Ordering::AcqRel)
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    // =========================================================================
    // Peers and engine
    // =========================================================================

    /// Attach a helper task that is not independently scheduled
    pub fn add_peer(&self, peer: Arc<TaskContext>) {
        self.peers.write().push(peer);
    }

    pub fn peers(&self) -> Vec<Arc<TaskContext>> {
        self.peers.read().clone()
    }

    /// Engine currently driving this task, if any
    pub fn engine(&self) -> Option<Arc<ExecutionEngine>> {
        self.engine.read().upgrade()
    }

    pub(crate) fn bind_engine(&self, engine: &Arc<ExecutionEngine>) {
        *self.engine.write() = Arc::downgrade(engine);
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("role", &self.role)
            .field("state", &self.state())
            .field("pending", &self.pending.len())
            .finish()
    }
}
