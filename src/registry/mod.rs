/*!
 * Component Registry
 * Process-wide catalogue of component factories, types and live tasks
 *
 * One registry is authoritative for the process image. Modules loaded at
 * runtime are merged into it through their [`ModuleSlot`]; see `module.rs`.
 */

mod barrier;
pub mod library;
pub mod module;
mod resources;
pub mod spec;

pub use library::{resolve_library_path, DylibLoader, LibraryLoad, LoadedModule, ModuleLoader};
pub use module::{InstallFn, MergeOutcome, ModuleSlot};
pub use spec::{ComponentFactory, ComponentSpec, TaskRole, TypeSpec};

use crate::core::errors::{LibraryError, LibraryResult};
use crate::task::TaskContext;
use ahash::RandomState;
use barrier::ConfigBarrier;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Name-keyed map returned by registry lookups
pub type NameMap<V> = HashMap<String, V, RandomState>;

fn install_nothing(_: &ComponentRegistry) {}

/// Slot of the host executable; never exported
static HOST_SLOT: ModuleSlot = ModuleSlot::new(install_nothing);

struct Inner {
    specs: NameMap<Arc<ComponentSpec>>,
    types: NameMap<Arc<TypeSpec>>,
    types_by_id: HashMap<TypeId, Arc<TypeSpec>, RandomState>,
    tasks: NameMap<Arc<TaskContext>>,
    resource_paths: Vec<PathBuf>,
}

impl Inner {
    fn new() -> Self {
        Self {
            specs: HashMap::with_hasher(RandomState::new()),
            types: HashMap::with_hasher(RandomState::new()),
            types_by_id: HashMap::with_hasher(RandomState::new()),
            tasks: HashMap::with_hasher(RandomState::new()),
            resource_paths: Vec::new(),
        }
    }
}

pub struct ComponentRegistry {
    inner: RwLock<Inner>,
    libraries: RwLock<HashMap<PathBuf, Box<dyn LoadedModule>, RandomState>>,
    load_lock: Mutex<()>,
    loader: Box<dyn ModuleLoader>,
    profiling: AtomicBool,
    barrier: ConfigBarrier,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    /// Empty registry loading modules through the platform dynamic linker
    pub fn new() -> Self {
        Self::with_loader(DylibLoader)
    }

    pub fn with_loader(loader: impl ModuleLoader + 'static) -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
            libraries: RwLock::new(HashMap::with_hasher(RandomState::new())),
            load_lock: Mutex::new(()),
            loader: Box::new(loader),
            profiling: AtomicBool::new(false),
            barrier: ConfigBarrier::new(),
        }
    }

    /// The authoritative registry of this process, created on first use
    pub fn global() -> Arc<ComponentRegistry> {
        HOST_SLOT.registry()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a component factory; a later registration under the same name wins
    pub fn add_spec(&self, spec: ComponentSpec) -> Arc<ComponentSpec> {
        let spec = Arc::new(spec);
        debug!("Registry {:p}: adding spec {}", self, spec.name());
        if let Some(previous) = self
            .inner
            .write()
            .specs
            .insert(spec.name().to_string(), Arc::clone(&spec))
        {
            debug!("Spec {} replaced ({:?})", previous.name(), previous.role());
        }
        spec
    }

    /// Register a type descriptor under its name and its type identity
    pub fn add_type(&self, spec: TypeSpec) -> Arc<TypeSpec> {
        let spec = Arc::new(spec);
        debug!("Registry {:p}: adding type {} ({})", self, spec.name(), spec.type_name());
        let mut inner = self.inner.write();
        inner.types.insert(spec.name().to_string(), Arc::clone(&spec));
        inner.types_by_id.insert(spec.type_id(), Arc::clone(&spec));
        spec
    }

    /// Make the spec registered as `old_name` also available as `new_name`
    pub fn alias(&self, new_name: &str, old_name: &str) {
        let mut inner = self.inner.write();
        if let Some(spec) = inner.specs.get(old_name).cloned() {
            debug!("Alias {} -> {}", new_name, old_name);
            inner.specs.insert(new_name.to_string(), spec);
        }
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Instantiate the component `spec` as task `instance`
    ///
    /// Returns None when no spec is registered under `spec`. An existing task
    /// with the same instance name is replaced.
    pub fn create(&self, spec: &str, instance: &str) -> Option<Arc<TaskContext>> {
        self.create_with_role(spec, instance, None)
    }

    /// Instantiate `spec` as a peer whatever role the spec declares
    ///
    /// Peers are driven by their owner, so they never join the configuration barrier.
    pub fn create_peer(&self, spec: &str, instance: &str) -> Option<Arc<TaskContext>> {
        self.create_with_role(spec, instance, Some(TaskRole::Peer))
    }

    fn create_with_role(&self, spec: &str, instance: &str, role: Option<TaskRole>) -> Option<Arc<TaskContext>> {
        let spec = self.inner.read().specs.get(spec).cloned()?;

        // Factories may touch the registry; run them outside the lock
        let task = Arc::new(spec.instantiate_as(instance, role.unwrap_or_else(|| spec.role())));

        let replaced = self
            .inner
            .write()
            .tasks
            .insert(instance.to_string(), Arc::clone(&task));
        if replaced.is_some() {
            warn!("Task {} replaced by a new {} instance", instance, spec.name());
        }

        if !task.is_peer() {
            self.barrier.add_tasks(1);
        }

        debug!("Created task {} from {}", instance, spec.name());
        Some(task)
    }

    /// Drop a task and rebalance the configuration counters
    pub fn remove_task(&self, name: &str) -> Option<Arc<TaskContext>> {
        let task = self.inner.write().tasks.remove(name)?;
        if !task.is_peer() {
            self.barrier.remove_task(task.is_configured());
        }
        debug!("Removed task {}", name);
        Some(task)
    }

    pub fn task(&self, name: &str) -> Option<Arc<TaskContext>> {
        self.inner.read().tasks.get(name).cloned()
    }

    pub fn tasks(&self) -> NameMap<Arc<TaskContext>> {
        self.inner.read().tasks.clone()
    }

    pub fn components(&self) -> NameMap<Arc<ComponentSpec>> {
        self.inner.read().specs.clone()
    }

    pub fn component(&self, name: &str) -> Option<Arc<ComponentSpec>> {
        self.inner.read().specs.get(name).cloned()
    }

    // =========================================================================
    // Types
    // =========================================================================

    pub fn type_by_name(&self, name: &str) -> Option<Arc<TypeSpec>> {
        self.inner.read().types.get(name).cloned()
    }

    pub fn type_by_id(&self, id: TypeId) -> Option<Arc<TypeSpec>> {
        self.inner.read().types_by_id.get(&id).cloned()
    }

    pub fn type_of<T: 'static>(&self) -> Option<Arc<TypeSpec>> {
        self.type_by_id(TypeId::of::<T>())
    }

    pub fn types(&self) -> NameMap<Arc<TypeSpec>> {
        self.inner.read().types.clone()
    }

    // =========================================================================
    // Profiling and configuration barrier
    // =========================================================================

    #[inline]
    pub fn profiling_enabled(&self) -> bool {
        self.profiling.load(Ordering::Relaxed)
    }

    pub fn enable_profiling(&self, enable: bool) {
        self.profiling.store(enable, Ordering::Relaxed);
        info!("Profiling {}", if enable { "enabled" } else { "disabled" });
    }

    /// Scheduled (non-peer) tasks created so far
    pub fn num_tasks(&self) -> usize {
        self.barrier.tasks()
    }

    pub fn increase_config_completed(&self) {
        self.barrier.add_completed(1);
    }

    pub fn num_config_completed(&self) -> usize {
        self.barrier.completed()
    }

    /// Block until every scheduled task finished configuring; false on timeout
    pub fn wait_configured(&self, timeout: Duration) -> bool {
        self.barrier.wait(timeout)
    }

    // =========================================================================
    // Resources
    // =========================================================================

    /// Replace the resource search directories
    pub fn set_resources_path<I, P>(&self, dirs: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.inner.write().resource_paths = dirs.into_iter().map(resources::normalize).collect();
    }

    pub fn add_resource_path(&self, dir: impl AsRef<Path>) {
        self.inner.write().resource_paths.push(resources::normalize(dir));
    }

    pub fn resource_paths(&self) -> Vec<PathBuf> {
        self.inner.read().resource_paths.clone()
    }

    /// Locate `name` as given, then in each search directory in order
    pub fn resource_finder(&self, name: &str) -> Option<PathBuf> {
        let dirs = self.resource_paths();
        let found = resources::find(name, &dirs);
        if found.is_none() {
            debug!("Resource {} not found in {:?}", name, dirs);
        }
        found
    }

    // =========================================================================
    // Libraries
    // =========================================================================

    /// Paths of the modules loaded into this registry
    pub fn libraries(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.libraries.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Load a component module and merge it into this registry
    ///
    /// Loading the same resolved path twice is a no-op. On failure nothing is
    /// recorded.
    pub fn load_library(self: &Arc<Self>, name: &str, dir: Option<&Path>) -> LibraryResult<LibraryLoad> {
        let path = resolve_library_path(name, dir);
        let _guard = self.load_lock.lock();

        if self.libraries.read().contains_key(&path) {
            debug!("Library {} already loaded", path.display());
            return Ok(LibraryLoad::AlreadyLoaded(path));
        }

        let module = self.loader.load(&path)?;
        let outcome = module.slot().merge_into(self);
        info!("Loaded library {} ({:?})", path.display(), outcome);

        self.libraries.write().insert(path.clone(), module);
        Ok(LibraryLoad::Loaded { path, outcome })
    }

    /// `load_library` reporting success as a flag; failures are logged
    pub fn add_library(self: &Arc<Self>, name: &str, dir: Option<&Path>) -> bool {
        match self.load_library(name, dir) {
            Ok(_) => true,
            Err(e @ LibraryError::NotFound(_)) => {
                debug!("{}", e);
                false
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    /// Move everything registered in `other` into this registry
    ///
    /// Collisions are resolved in favour of `other`. Absorbed tasks join the
    /// configuration barrier of this registry.
    pub(crate) fn absorb(&self, other: &ComponentRegistry) {
        let (specs, types, types_by_id, tasks) = {
            let theirs = other.inner.read();
            (
                theirs.specs.clone(),
                theirs.types.clone(),
                theirs.types_by_id.clone(),
                theirs.tasks.clone(),
            )
        };

        let mut scheduled = 0;
        let mut configured = 0;
        for task in tasks.values().filter(|t| !t.is_peer()) {
            scheduled += 1;
            if task.is_configured() {
                configured += 1;
            }
        }

        debug!(
            "Registry {:p} absorbing {} specs, {} types, {} tasks from {:p}",
            self,
            specs.len(),
            types.len(),
            tasks.len(),
            other
        );

        {
            let mut inner = self.inner.write();
            inner.specs.extend(specs);
            inner.types.extend(types);
            inner.types_by_id.extend(types_by_id);
            inner.tasks.extend(tasks);
        }

        if other.profiling_enabled() {
            self.profiling.store(true, Ordering::Relaxed);
        }
        self.barrier.add_tasks(scheduled);
        self.barrier.add_completed(configured);
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ComponentRegistry")
            .field("specs", &inner.specs.len())
            .field("types", &inner.types.len())
            .field("tasks", &inner.tasks.len())
            .field("libraries", &self.libraries.read().len())
            .field("profiling", &self.profiling_enabled())
            .field("num_tasks", &self.num_tasks())
            .field("config_completed", &self.num_config_completed())
            .finish()
    }
}
