//! Opening native modules and resolving their symbols
//!
//! [`LibLoader`] goes through the platform dynamic loader. [`InProcessLoader`]
//! serves modules that are linked into the host binary: it maps a path to a
//! table of real `extern "C"` entry points, so everything above this layer
//! behaves the same either way.

use crate::ExtensionError;
use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};

/// An opened module. Dropping it unloads the module.
pub trait ModuleLibrary: Send + Sync {
    /// Address of an exported symbol, or `None` if absent.
    fn symbol(&self, name: &str) -> Option<*const c_void>;
}

/// Opens modules by path.
pub trait ModuleLoader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn ModuleLibrary>, ExtensionError>;
}

/// File suffix of native modules on this platform, without the dot.
pub fn native_extension_suffix() -> &'static str {
    std::env::consts::DLL_EXTENSION
}

/// Loader backed by `libloading`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibLoader;

struct NativeLibrary {
    library: libloading::Library,
}

impl ModuleLibrary for NativeLibrary {
    fn symbol(&self, name: &str) -> Option<*const c_void> {
        // SAFETY: the symbol is read as an opaque address; callers cast it to
        // the entry-point type the ABI prescribes for `name`.
        let symbol: libloading::Symbol<*const c_void> =
            unsafe { self.library.get(name.as_bytes()) }.ok()?;
        let address = *symbol;
        if address.is_null() {
            None
        } else {
            Some(address)
        }
    }
}

impl ModuleLoader for LibLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn ModuleLibrary>, ExtensionError> {
        // SAFETY: opening a library runs its initializers. Modules in the
        // extension directory are trusted to be extension modules; everything
        // they export is validated before use.
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
            ExtensionError::Load {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        Ok(Box::new(NativeLibrary { library }))
    }
}

/// Symbols exported by one in-process module.
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    // Stored as addresses so the table is Send + Sync.
    symbols: HashMap<String, usize>,
}

impl ExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, name: impl Into<String>, address: *const c_void) -> Self {
        self.symbols.insert(name.into(), address as usize);
        self
    }

    pub fn without_symbol(mut self, name: &str) -> Self {
        self.symbols.remove(name);
        self
    }
}

struct InProcessLibrary {
    exports: ExportTable,
}

impl ModuleLibrary for InProcessLibrary {
    fn symbol(&self, name: &str) -> Option<*const c_void> {
        self.exports
            .symbols
            .get(name)
            .filter(|&&address| address != 0)
            .map(|&address| address as *const c_void)
    }
}

/// Loader for modules linked into the host process.
#[derive(Debug, Clone, Default)]
pub struct InProcessLoader {
    modules: HashMap<PathBuf, ExportTable>,
}

impl InProcessLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, path: impl Into<PathBuf>, exports: ExportTable) -> Self {
        self.insert(path, exports);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, exports: ExportTable) {
        self.modules.insert(path.into(), exports);
    }
}

impl ModuleLoader for InProcessLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn ModuleLibrary>, ExtensionError> {
        let exports = self.modules.get(path).cloned().ok_or_else(|| ExtensionError::Load {
            path: path.to_path_buf(),
            reason: "no in-process module registered for this path".to_string(),
        })?;
        Ok(Box::new(InProcessLibrary { exports }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn marker() {}

    #[test]
    fn test_in_process_resolves_symbols() {
        let address = marker as extern "C" fn() as *const c_void;
        let loader = InProcessLoader::new()
            .with_module("/ext/marker.so", ExportTable::new().with_symbol("marker", address));

        let library = loader.open(Path::new("/ext/marker.so")).unwrap();
        assert_eq!(library.symbol("marker"), Some(address));
        assert_eq!(library.symbol("missing"), None);
    }

    #[test]
    fn test_in_process_unknown_path() {
        let loader = InProcessLoader::new();
        let err = loader.open(Path::new("/ext/none.so")).err().unwrap();
        assert!(matches!(err, ExtensionError::Load { .. }));
    }

    #[test]
    fn test_lib_loader_reports_missing_file() {
        let err = LibLoader
            .open(Path::new("/definitely/not/here/libnothing.so"))
            .err()
            .unwrap();
        assert!(matches!(err, ExtensionError::Load { .. }));
    }

    #[test]
    fn test_native_suffix_is_known() {
        assert!(["so", "dylib", "dll"].contains(&native_extension_suffix()));
    }
}
