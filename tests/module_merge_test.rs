/*!
 * Module Merge Tests
 * Library loading and registry merging through module slots
 */

use pretty_assertions::assert_eq;
use rtgraph::registry::{resolve_library_path, LoadedModule, ModuleLoader};
use rtgraph::{Component, ComponentRegistry, ComponentSpec, LibraryError, LibraryLoad, MergeOutcome, ModuleSlot};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Blink;

impl Component for Blink {
    fn on_update(&mut self) {}
}

fn install_alpha(registry: &ComponentRegistry) {
    registry.add_spec(ComponentSpec::of::<Blink>("Alpha"));
}

fn install_beta(registry: &ComponentRegistry) {
    registry.add_spec(ComponentSpec::of::<Blink>("Beta"));
}

mod plugin {
    use super::*;

    fn install(registry: &ComponentRegistry) {
        registry.add_spec(ComponentSpec::of::<Blink>("Plugin"));
    }

    rtgraph::export_module!(install);
}

struct FakeModule {
    path: PathBuf,
    slot: &'static ModuleSlot,
}

impl LoadedModule for FakeModule {
    fn path(&self) -> &Path {
        &self.path
    }

    fn slot(&self) -> &ModuleSlot {
        self.slot
    }
}

/// In-process loader; `None` entries model a library without the accessor
#[derive(Clone, Default)]
struct FakeLoader {
    modules: Arc<HashMap<PathBuf, Option<&'static ModuleSlot>>>,
    opens: Arc<AtomicUsize>,
}

impl ModuleLoader for FakeLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn LoadedModule>, LibraryError> {
        let entry = self
            .modules
            .get(path)
            .ok_or_else(|| LibraryError::NotFound(path.to_path_buf()))?;
        self.opens.fetch_add(1, Ordering::SeqCst);

        let slot = entry.ok_or_else(|| LibraryError::MissingSymbol {
            path: path.to_path_buf(),
            symbol: "rtgraph_module_slot".into(),
        })?;

        Ok(Box::new(FakeModule {
            path: path.to_path_buf(),
            slot,
        }))
    }
}

fn leak_slot(install: fn(&ComponentRegistry)) -> &'static ModuleSlot {
    Box::leak(Box::new(ModuleSlot::new(install)))
}

fn dir() -> &'static Path {
    Path::new("/modules")
}

fn host_with(entries: Vec<(&str, Option<&'static ModuleSlot>)>) -> (Arc<ComponentRegistry>, FakeLoader) {
    let modules = entries
        .into_iter()
        .map(|(name, slot)| (resolve_library_path(name, Some(dir())), slot))
        .collect();
    let loader = FakeLoader {
        modules: Arc::new(modules),
        opens: Arc::new(AtomicUsize::new(0)),
    };
    (Arc::new(ComponentRegistry::with_loader(loader.clone())), loader)
}

#[test]
fn test_empty_slot_receives_host_registry() {
    let slot = leak_slot(install_alpha);
    let (host, _) = host_with(vec![("alpha", Some(slot))]);

    let load = host.load_library("alpha", Some(dir())).unwrap();
    assert_eq!(
        load,
        LibraryLoad::Loaded {
            path: resolve_library_path("alpha", Some(dir())),
            outcome: MergeOutcome::Propagated,
        }
    );
    assert!(host.component("Alpha").is_some());
    assert!(Arc::ptr_eq(&slot.registry(), &host));
}

#[test]
fn test_add_library_is_idempotent() {
    let slot = leak_slot(install_alpha);
    let (host, loader) = host_with(vec![("alpha", Some(slot))]);

    assert!(host.add_library("alpha", Some(dir())));
    assert!(host.add_library("alpha", Some(dir())));
    assert!(matches!(
        host.load_library("alpha", Some(dir())),
        Ok(LibraryLoad::AlreadyLoaded(_))
    ));

    assert_eq!(loader.opens.load(Ordering::SeqCst), 1);
    assert_eq!(host.libraries().len(), 1);
}

#[test]
fn test_used_module_registry_is_absorbed() {
    let slot = leak_slot(install_beta);
    let (host, _) = host_with(vec![("beta", Some(slot))]);
    host.add_spec(ComponentSpec::of::<Blink>("Alpha"));

    // The module already built its private registry and a task in it
    let private = slot.registry();
    private.create("Beta", "b1").unwrap();
    assert!(host.component("Beta").is_none());

    let load = host.load_library("beta", Some(dir())).unwrap();
    assert!(matches!(
        load,
        LibraryLoad::Loaded {
            outcome: MergeOutcome::Absorbed,
            ..
        }
    ));

    let mut names: Vec<String> = host.components().into_keys().collect();
    names.sort();
    assert_eq!(names, vec!["Alpha", "Beta"]);
    assert!(host.task("b1").is_some());
    assert_eq!(host.num_tasks(), 1);

    assert!(Arc::ptr_eq(&slot.registry(), &host));
    assert!(!Arc::ptr_eq(&private, &host));
}

#[test]
fn test_shared_slot_is_left_alone() {
    let slot = leak_slot(install_alpha);
    let (host, _) = host_with(vec![("alpha", Some(slot)), ("alpha_again", Some(slot))]);

    assert!(host.add_library("alpha", Some(dir())));
    let load = host.load_library("alpha_again", Some(dir())).unwrap();
    assert!(matches!(
        load,
        LibraryLoad::Loaded {
            outcome: MergeOutcome::AlreadyShared,
            ..
        }
    ));
    assert_eq!(host.libraries().len(), 2);
}

#[test]
fn test_failures_leave_no_state() {
    let (host, loader) = host_with(vec![("broken", None)]);

    assert!(matches!(
        host.load_library("broken", Some(dir())),
        Err(LibraryError::MissingSymbol { .. })
    ));
    assert!(matches!(
        host.load_library("absent", Some(dir())),
        Err(LibraryError::NotFound(_))
    ));
    assert!(!host.add_library("broken", Some(dir())));

    assert!(host.libraries().is_empty());
    assert!(host.components().is_empty());
    assert_eq!(loader.opens.load(Ordering::SeqCst), 2);
}

#[test]
fn test_exported_module_slot() {
    // SAFETY: the accessor returns the address of a static in this binary
    let slot: &'static ModuleSlot = unsafe { &*plugin::rtgraph_module_slot() };
    assert!(std::ptr::eq(slot, &plugin::MODULE_SLOT));

    let (host, _) = host_with(vec![("plugin", Some(slot))]);
    assert!(host.add_library("plugin", Some(dir())));
    assert!(host.component("Plugin").is_some());
    assert!(Arc::ptr_eq(&plugin::MODULE_SLOT.registry(), &host));
}
