/*!
 * Registration Descriptors
 * Component factories and type descriptors
 */

use crate::task::{Component, TaskContext};
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Whether a task is scheduled by an activity or hosted by another task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRole {
    #[default]
    Scheduled,
    /// Helper task; excluded from the configuration barrier count
    Peer,
}

pub type ComponentFactory = Arc<dyn Fn() -> Box<dyn Component> + Send + Sync>;

/// Factory bound to a component class name
#[derive(Clone)]
pub struct ComponentSpec {
    name: String,
    role: TaskRole,
    factory: ComponentFactory,
}

impl ComponentSpec {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Component> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            role: TaskRole::Scheduled,
            factory: Arc::new(factory),
        }
    }

    /// Spec for a `Default`-constructible component
    pub fn of<T: Component + Default>(name: impl Into<String>) -> Self {
        Self::new(name, || Box::new(T::default()))
    }

    /// Mark instances of this spec as peers
    pub fn peer(mut self) -> Self {
        self.role = TaskRole::Peer;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn role(&self) -> TaskRole {
        self.role
    }

    /// Build a fresh task instance named `instance`
    pub fn instantiate(&self, instance: &str) -> TaskContext {
        self.instantiate_as(instance, self.role)
    }

    /// Build an instance with `role` in place of the spec's own role
    pub fn instantiate_as(&self, instance: &str, role: TaskRole) -> TaskContext {
        TaskContext::new(instance, self.name.as_str(), role, (self.factory)())
    }
}

impl fmt::Debug for ComponentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSpec")
            .field("name", &self.name)
            .field("role", &self.role)
            .finish()
    }
}

type RenderFn = fn(&dyn Any) -> Option<String>;

/// Named type descriptor with a JSON rendering hook
#[derive(Clone)]
pub struct TypeSpec {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    render: RenderFn,
}

fn render_json<T: Serialize + 'static>(value: &dyn Any) -> Option<String> {
    value
        .downcast_ref::<T>()
        .and_then(|v| serde_json::to_string(v).ok())
}

impl TypeSpec {
    pub fn of<T: Serialize + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            render: render_json::<T>,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type path, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Render `value` as JSON text; None if it is not of this type
    pub fn render(&self, value: &dyn Any) -> Option<String> {
        (self.render)(value)
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSpec")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Idle;

    impl Component for Idle {
        fn on_update(&mut self) {}
    }

    #[test]
    fn test_instantiate_carries_role_and_class() {
        let spec = ComponentSpec::of::<Idle>("Idle").peer();
        let task = spec.instantiate("idle1");
        assert_eq!(task.instantiation_name(), "idle1");
        assert_eq!(task.class_name(), "Idle");
        assert!(task.is_peer());
    }

    #[test]
    fn test_render_matches_type() {
        let spec = TypeSpec::of::<Vec<i32>>("ints");
        assert_eq!(spec.render(&vec![1, 2, 3]).as_deref(), Some("[1,2,3]"));
        assert_eq!(spec.render(&"text"), None);
        assert_eq!(spec.type_id(), TypeId::of::<Vec<i32>>());
    }
}
