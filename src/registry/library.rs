/*!
 * Library Loading
 * Locates component modules on disk and opens them
 */

use super::module::{MergeOutcome, ModuleSlot};
use crate::core::errors::{LibraryError, LibraryResult};
use crate::core::limits::MODULE_SLOT_SYMBOL;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fmt;
use std::path::{Path, PathBuf};

/// An opened module; keeps its code mapped while alive
pub trait LoadedModule: Send + Sync {
    fn path(&self) -> &Path;

    /// Slot exported by the module
    fn slot(&self) -> &ModuleSlot;
}

/// Strategy used by the registry to open modules
pub trait ModuleLoader: Send + Sync {
    fn load(&self, path: &Path) -> LibraryResult<Box<dyn LoadedModule>>;
}

/// Result of a successful `load_library`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryLoad {
    /// Path was loaded before; nothing was reopened
    AlreadyLoaded(PathBuf),
    Loaded { path: PathBuf, outcome: MergeOutcome },
}

impl LibraryLoad {
    pub fn path(&self) -> &Path {
        match self {
            LibraryLoad::AlreadyLoaded(path) | LibraryLoad::Loaded { path, .. } => path,
        }
    }
}

/// Platform file name for a bare library name, optionally inside `dir`
///
/// `echo` becomes `libecho.so` on Linux; names that already look like a
/// path (separator or platform suffix) are used unchanged.
pub fn resolve_library_path(name: &str, dir: Option<&Path>) -> PathBuf {
    let looks_like_path = name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) || name.ends_with(DLL_SUFFIX);

    let file = if looks_like_path {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{}{}{}", DLL_PREFIX, name, DLL_SUFFIX))
    };

    match dir {
        Some(dir) if !dir.as_os_str().is_empty() && file.is_relative() => dir.join(file),
        _ => file,
    }
}

/// Loader backed by the platform dynamic linker
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

type SlotAccessor = unsafe extern "C" fn() -> *const ModuleSlot;

struct DylibModule {
    path: PathBuf,
    slot: *const ModuleSlot,
    // Declared last: dropped after the slot pointer is no longer reachable
    _library: libloading::Library,
}

// SAFETY: the slot points at a `static ModuleSlot` (Sync) inside the library,
// which stays mapped for as long as `_library` is alive.
unsafe impl Send for DylibModule {}
unsafe impl Sync for DylibModule {}

impl LoadedModule for DylibModule {
    fn path(&self) -> &Path {
        &self.path
    }

    fn slot(&self) -> &ModuleSlot {
        // SAFETY: see the Send/Sync impls above
        unsafe { &*self.slot }
    }
}

impl ModuleLoader for DylibLoader {
    fn load(&self, path: &Path) -> LibraryResult<Box<dyn LoadedModule>> {
        if !path.exists() {
            return Err(LibraryError::NotFound(path.to_path_buf()));
        }

        // SAFETY: loading runs the module's initialisers; modules are trusted
        // component libraries built against this crate.
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| LibraryError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let missing = || LibraryError::MissingSymbol {
            path: path.to_path_buf(),
            symbol: MODULE_SLOT_SYMBOL.to_string(),
        };

        // SAFETY: the symbol is generated by `export_module!` with this signature
        let slot = unsafe {
            let accessor = library
                .get::<SlotAccessor>(MODULE_SLOT_SYMBOL.as_bytes())
                .map_err(|_| missing())?;
            accessor()
        };

        if slot.is_null() {
            return Err(missing());
        }

        Ok(Box::new(DylibModule {
            path: path.to_path_buf(),
            slot,
            _library: library,
        }))
    }
}

impl fmt::Debug for dyn LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule").field("path", &self.path()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name_gets_platform_affixes() {
        let expected = format!("{}echo{}", DLL_PREFIX, DLL_SUFFIX);
        assert_eq!(resolve_library_path("echo", None), PathBuf::from(&expected));
        assert_eq!(
            resolve_library_path("echo", Some(Path::new("/opt/modules"))),
            Path::new("/opt/modules").join(&expected)
        );
    }

    #[test]
    fn test_path_like_names_are_kept() {
        assert_eq!(
            resolve_library_path("/opt/libfoo.so", Some(Path::new("/ignored"))),
            PathBuf::from("/opt/libfoo.so")
        );
        assert_eq!(resolve_library_path("build/libfoo", None), PathBuf::from("build/libfoo"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libnothing.so");
        match DylibLoader.load(&path) {
            Err(LibraryError::NotFound(p)) => assert_eq!(p, path),
            other => panic!("unexpected: {:?}", other.map(|m| m.path().to_path_buf())),
        }
    }

    #[test]
    fn test_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("{}garbage{}", DLL_PREFIX, DLL_SUFFIX));
        std::fs::write(&path, b"not a shared object").unwrap();
        assert!(matches!(DylibLoader.load(&path), Err(LibraryError::OpenFailed { .. })));
    }
}
