/*!
 * Component Trait
 * The user-implemented behaviour behind every task
 */

use std::any::Any;

/// Type-erased access to a concrete component
///
/// Blanket-implemented for every `'static` type; lets callers recover the
/// concrete type behind a `dyn Component`.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behaviour of a task
///
/// Hooks are invoked by the execution engine on the owning activity's thread.
/// Errors inside hooks are the component's own concern: the engine only
/// manages the state transitions around the calls.
pub trait Component: AsAny + Send {
    /// Called once before the first step
    fn on_config(&mut self) {}

    /// Called on every step of the owning activity
    fn on_update(&mut self);

    /// Called once when the owning activity finalizes
    fn on_stop(&mut self) {}

    /// Free-form description shown by monitoring
    fn info(&self) -> String {
        String::new()
    }
}
