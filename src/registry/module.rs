/*!
 * Module Slot
 * Per-module registry cell used to merge dynamically loaded modules into one registry
 *
 * Every component module owns one static `ModuleSlot` and exports an accessor
 * for it (see [`export_module!`](crate::export_module)). Inside the module the
 * slot lazily materialises a private registry the first time it is needed.
 * When the host loads the module it hands its own registry to the slot:
 *
 * - empty slot: the host registry is stored and the module's registration
 *   function runs against it
 * - slot holds another registry: its content is absorbed by the host, the
 *   host registry replaces it and the orphan is dropped
 * - slot already holds the host registry: nothing to do
 */

use super::ComponentRegistry;
use arc_swap::ArcSwapOption;
use log::debug;
use parking_lot::{const_mutex, Mutex};
use std::fmt;
use std::sync::Arc;

/// Registration function of a module
pub type InstallFn = fn(&ComponentRegistry);

/// Result of handing a registry to a module slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Propagated,
    Absorbed,
    AlreadyShared,
}

pub struct ModuleSlot {
    registry: ArcSwapOption<ComponentRegistry>,
    init_lock: Mutex<()>,
    install: InstallFn,
}

impl ModuleSlot {
    pub const fn new(install: InstallFn) -> Self {
        Self {
            registry: ArcSwapOption::const_empty(),
            init_lock: const_mutex(()),
            install,
        }
    }

    /// Registry currently stored, without materialising one
    pub fn current(&self) -> Option<Arc<ComponentRegistry>> {
        self.registry.load_full()
    }

    /// Registry of this module, built and populated on first use
    pub fn registry(&self) -> Arc<ComponentRegistry> {
        if let Some(registry) = self.registry.load_full() {
            return registry;
        }

        let _guard = self.init_lock.lock();
        if let Some(registry) = self.registry.load_full() {
            return registry;
        }

        // Stored before install so that install may reach it through this slot
        let registry = Arc::new(ComponentRegistry::new());
        self.registry.store(Some(Arc::clone(&registry)));
        (self.install)(&*registry);
        registry
    }

    /// Make `host` the registry of this module
    pub fn merge_into(&self, host: &Arc<ComponentRegistry>) -> MergeOutcome {
        let _guard = self.init_lock.lock();

        match self.registry.load_full() {
            None => {
                debug!("Propagating registry {:p} to module slot {:p}", Arc::as_ptr(host), self);
                self.registry.store(Some(Arc::clone(host)));
                (self.install)(&**host);
                MergeOutcome::Propagated
            }
            Some(existing) if Arc::ptr_eq(&existing, host) => {
                debug!("Module slot {:p} already shares registry {:p}", self, Arc::as_ptr(host));
                MergeOutcome::AlreadyShared
            }
            Some(orphan) => {
                debug!(
                    "Registry {:p} absorbing {:p} from module slot {:p}",
                    Arc::as_ptr(host),
                    Arc::as_ptr(&orphan),
                    self
                );
                host.absorb(&*orphan);
                self.registry.store(Some(Arc::clone(host)));
                MergeOutcome::Absorbed
            }
        }
    }
}

impl fmt::Debug for ModuleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSlot")
            .field("registry", &self.current().map(|r| Arc::as_ptr(&r)))
            .finish()
    }
}

/// Export the module slot accessor of a component module
///
/// ```ignore
/// fn install(registry: &rtgraph::ComponentRegistry) {
///     registry.add_spec(rtgraph::ComponentSpec::of::<Echo>("Echo"));
/// }
///
/// rtgraph::export_module!(install);
/// ```
///
/// Expands to a `MODULE_SLOT` static and the `rtgraph_module_slot` symbol.
/// Module code reaches its (possibly shared) registry with `MODULE_SLOT.registry()`.
#[macro_export]
macro_rules! export_module {
    ($install:path) => {
        pub static MODULE_SLOT: $crate::registry::ModuleSlot = $crate::registry::ModuleSlot::new($install);

        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn rtgraph_module_slot() -> *const $crate::registry::ModuleSlot {
            &MODULE_SLOT
        }
    };
}
