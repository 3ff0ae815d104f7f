//! Finding, loading and tracking extension modules in a directory
//!
//! Discovery owns every [`ExtensionModule`] it loads. The registry receives
//! shared handles; whenever a module is dropped from tracking its names are
//! unregistered first and the module is deactivated before the handle is
//! released.

use crate::abi::HostServices;
use crate::extension::{ExtensionInfo, ExtensionModule};
use crate::host::host_services;
use crate::loader::{native_extension_suffix, LibLoader, ModuleLoader};
use crate::operation::Operation;
use crate::registry::{standardize_name, OperationRegistry};
use abacus_core::{CalcError, CalcResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Why a candidate file did not end up loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a [`ExtensionDiscovery::scan`] or [`ExtensionDiscovery::refresh`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    /// Newly loaded and registered
    pub loaded: Vec<PathBuf>,
    /// Loaded and active, but a name is already taken
    pub shadowed: Vec<PathBuf>,
    /// Previously shadowed, registered now
    pub promoted: Vec<PathBuf>,
    /// No longer tracked (file removed or reload failed)
    pub removed: Vec<PathBuf>,
    pub failed: Vec<ScanFailure>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
            && self.shadowed.is_empty()
            && self.promoted.is_empty()
            && self.removed.is_empty()
            && self.failed.is_empty()
    }
}

struct TrackedModule {
    module: Arc<ExtensionModule>,
    /// Standardized, deduplicated, primary first
    names: Vec<String>,
    registered: bool,
}

/// Whether `path` names a file discovery should try to load.
///
/// Hidden files, editor backups and temporary files are ignored, as is
/// anything without the module suffix.
pub fn is_candidate(path: &Path, suffix: &str) -> bool {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if file_name.starts_with('.')
        || file_name.contains('~')
        || file_name.contains(".tmp")
        || file_name.contains(".bak")
    {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(suffix))
}

pub struct ExtensionDiscovery {
    loader: Box<dyn ModuleLoader>,
    suffix: String,
    services: &'static HostServices,
    modules: BTreeMap<PathBuf, TrackedModule>,
    /// Registered name → owning module path
    owners: HashMap<String, PathBuf>,
}

impl ExtensionDiscovery {
    /// Discovery through the platform dynamic loader.
    pub fn new() -> Self {
        Self::with_loader(LibLoader)
    }

    pub fn with_loader(loader: impl ModuleLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            suffix: native_extension_suffix().to_string(),
            services: host_services(),
            modules: BTreeMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Override the file suffix (without the dot) recognized as a module.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Load every new candidate in `directory` and register its names.
    ///
    /// Individual failures are logged and reported; only an unreadable
    /// directory fails the scan. Modules already tracked are left alone, so
    /// scanning twice is a no-op apart from retrying shadowed modules.
    pub fn scan(
        &mut self,
        directory: &Path,
        registry: &mut OperationRegistry,
    ) -> CalcResult<ScanReport> {
        let mut report = ScanReport::default();
        self.retry_shadowed(registry, &mut report);

        let entries = std::fs::read_dir(directory).map_err(|e| CalcError::ExtensionLoad {
            path: directory.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .filter(|path| is_candidate(path, &self.suffix))
            .collect();
        candidates.sort();

        tracing::debug!(
            directory = %directory.display(),
            candidates = candidates.len(),
            "scanning for extensions"
        );

        for path in candidates {
            if self.modules.contains_key(&path) {
                continue;
            }
            self.load_and_track(path, registry, &mut report);
        }

        Ok(report)
    }

    /// Reload modules whose file changed since load; drop modules whose file
    /// disappeared.
    pub fn refresh(&mut self, registry: &mut OperationRegistry) -> ScanReport {
        let mut report = ScanReport::default();

        let stale: Vec<(PathBuf, bool)> = self
            .modules
            .iter()
            .filter_map(|(path, tracked)| {
                if !path.is_file() {
                    Some((path.clone(), false))
                } else if modified_time(path) != tracked.module.modified() {
                    Some((path.clone(), true))
                } else {
                    None
                }
            })
            .collect();

        for (path, still_present) in stale {
            self.unload_path(&path, registry);
            if still_present {
                tracing::info!(path = %path.display(), "extension changed on disk, reloading");
                if !self.load_and_track(path.clone(), registry, &mut report) {
                    report.removed.push(path);
                }
            } else {
                tracing::info!(path = %path.display(), "extension removed from disk");
                report.removed.push(path);
            }
        }

        self.retry_shadowed(registry, &mut report);
        report
    }

    /// Stop tracking the module at `path`: unregister its names, deactivate
    /// it, then release it. Returns whether a module was tracked there.
    pub fn unload_path(&mut self, path: &Path, registry: &mut OperationRegistry) -> bool {
        let Some(tracked) = self.modules.remove(path) else {
            return false;
        };
        if tracked.registered {
            registry.unregister_matching(&Operation::Extension(Arc::clone(&tracked.module)));
            for name in &tracked.names {
                self.owners.remove(name);
            }
        }
        tracked.module.deactivate();
        tracing::debug!(
            name = tracked.module.standardized_name(),
            path = %path.display(),
            "extension unloaded"
        );
        true
    }

    /// Unload every module.
    pub fn shutdown(&mut self, registry: &mut OperationRegistry) {
        let paths: Vec<PathBuf> = self.modules.keys().cloned().collect();
        for path in paths {
            self.unload_path(&path, registry);
        }
    }

    /// The module registered under `name` (standardized before lookup).
    pub fn lookup_by_name(&self, name: &str) -> Option<Arc<ExtensionModule>> {
        let path = self.owners.get(&standardize_name(name))?;
        self.modules.get(path).map(|t| Arc::clone(&t.module))
    }

    /// Every name registered by an extension, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.owners.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tracked modules in path order, including shadowed ones.
    pub fn modules(&self) -> impl Iterator<Item = &Arc<ExtensionModule>> {
        self.modules.values().map(|t| &t.module)
    }

    /// Snapshot of every tracked module, shadowed ones included.
    pub fn loaded(&self) -> Vec<ExtensionInfo> {
        self.modules().map(|m| m.info()).collect()
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.modules.contains_key(path)
    }

    pub fn is_shadowed(&self, path: &Path) -> bool {
        self.modules.get(path).map_or(false, |t| !t.registered)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Returns whether the module ended up tracked.
    fn load_and_track(
        &mut self,
        path: PathBuf,
        registry: &mut OperationRegistry,
        report: &mut ScanReport,
    ) -> bool {
        let module = match ExtensionModule::load(self.loader.as_ref(), &path) {
            Ok(module) => module,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load extension");
                report.failed.push(ScanFailure { path, reason: e.to_string() });
                return false;
            }
        };
        if let Err(e) = module.activate(self.services) {
            tracing::warn!(path = %path.display(), error = %e, "failed to activate extension");
            report.failed.push(ScanFailure { path, reason: e.to_string() });
            return false;
        }

        let mut names: Vec<String> = Vec::new();
        for name in module.all_names().iter().map(|n| standardize_name(n)) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        let mut tracked = TrackedModule {
            module: Arc::new(module),
            names,
            registered: false,
        };

        match self.try_register(&path, &mut tracked, registry) {
            Ok(()) => {
                tracing::info!(
                    name = tracked.module.standardized_name(),
                    path = %path.display(),
                    "extension loaded"
                );
                report.loaded.push(path.clone());
            }
            Err(taken) => {
                tracing::warn!(
                    name = tracked.module.standardized_name(),
                    conflict = %taken,
                    path = %path.display(),
                    "extension name already registered, module loaded but not registered"
                );
                report.shadowed.push(path.clone());
            }
        }
        self.modules.insert(path, tracked);
        true
    }

    /// Register every name of `tracked`, or none of them. On conflict returns
    /// the first name already taken.
    fn try_register(
        &mut self,
        path: &Path,
        tracked: &mut TrackedModule,
        registry: &mut OperationRegistry,
    ) -> Result<(), String> {
        if let Some(taken) = tracked.names.iter().find(|n| registry.exists(n)) {
            return Err(taken.clone());
        }

        let operation = Operation::Extension(Arc::clone(&tracked.module));
        for name in &tracked.names {
            if let Err(e) = registry.register(name, operation.clone()) {
                registry.unregister_matching(&operation);
                return Err(e.to_string());
            }
        }
        for name in &tracked.names {
            self.owners.insert(name.clone(), path.to_path_buf());
        }
        tracked.registered = true;
        Ok(())
    }

    fn retry_shadowed(&mut self, registry: &mut OperationRegistry, report: &mut ScanReport) {
        let shadowed: Vec<PathBuf> = self
            .modules
            .iter()
            .filter(|(_, t)| !t.registered)
            .map(|(p, _)| p.clone())
            .collect();

        for path in shadowed {
            let Some(mut tracked) = self.modules.remove(&path) else {
                continue;
            };
            if self.try_register(&path, &mut tracked, registry).is_ok() {
                tracing::info!(
                    name = tracked.module.standardized_name(),
                    path = %path.display(),
                    "previously shadowed extension registered"
                );
                report.promoted.push(path.clone());
            }
            self.modules.insert(path, tracked);
        }
    }
}

impl Default for ExtensionDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ExtensionDiscovery {
    fn drop(&mut self) {
        for tracked in self.modules.values() {
            tracked.module.deactivate();
        }
    }
}

impl fmt::Debug for ExtensionDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionDiscovery")
            .field("suffix", &self.suffix)
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .field("names", &self.list_names())
            .finish()
    }
}

/// Last-modified time of `path`, if the filesystem reports one.
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::InProcessLoader;
    use crate::operation::{BuiltinOperation, OperationKind};
    use crate::sdk::{export_table, Host, NativeExtension};
    use std::fs::File;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    static TWICE_CLEANUPS: AtomicUsize = AtomicUsize::new(0);

    struct Twice;

    impl NativeExtension for Twice {
        const NAME: &'static str = "Twice";
        const ALIASES: &'static [&'static str] = &["double", " TWICE "];
        const MIN_PARAMETERS: i32 = 1;
        const MAX_PARAMETERS: i32 = 1;

        fn compute(args: &[f64]) -> Result<f64, String> {
            Ok(args[0] * 2.0)
        }

        fn cleanup() {
            TWICE_CLEANUPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct TwiceAgain;

    impl NativeExtension for TwiceAgain {
        const NAME: &'static str = "twice";
        const MIN_PARAMETERS: i32 = 1;
        const MAX_PARAMETERS: i32 = 1;

        fn compute(args: &[f64]) -> Result<f64, String> {
            Ok(args[0] + args[0])
        }
    }

    struct Thrice;

    impl NativeExtension for Thrice {
        const NAME: &'static str = "thrice";
        const ALIASES: &'static [&'static str] = &["triple", "taken"];
        const MIN_PARAMETERS: i32 = 1;
        const MAX_PARAMETERS: i32 = 1;

        fn compute(args: &[f64]) -> Result<f64, String> {
            Ok(args[0] * 3.0)
        }
    }

    struct Broken;

    impl NativeExtension for Broken {
        const NAME: &'static str = "broken";
        const MIN_PARAMETERS: i32 = 0;
        const MAX_PARAMETERS: i32 = 0;

        fn compute(_args: &[f64]) -> Result<f64, String> {
            Ok(0.0)
        }

        fn initialize(host: &Host) -> Result<(), String> {
            host.error("refusing to start");
            Err("refusing to start".to_string())
        }
    }

    fn identity(args: &[f64]) -> CalcResult<f64> {
        Ok(args[0])
    }

    struct Fixture {
        dir: TempDir,
        loader: InProcessLoader,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                loader: InProcessLoader::new(),
            }
        }

        fn file(&self, stem: &str) -> PathBuf {
            self.dir
                .path()
                .join(format!("{}.{}", stem, native_extension_suffix()))
        }

        fn add<T: NativeExtension>(&mut self, stem: &str) -> PathBuf {
            let path = self.file(stem);
            File::create(&path).unwrap();
            self.loader.insert(path.clone(), export_table::<T>());
            path
        }

        fn add_raw(&mut self, file_name: &str) -> PathBuf {
            let path = self.dir.path().join(file_name);
            File::create(&path).unwrap();
            self.loader.insert(path.clone(), export_table::<Thrice>());
            path
        }

        fn discovery(&self) -> ExtensionDiscovery {
            ExtensionDiscovery::with_loader(self.loader.clone())
        }
    }

    fn touch_later(path: &Path) {
        let later = SystemTime::now() + Duration::from_secs(120);
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(later)
            .unwrap();
    }

    #[test]
    fn test_is_candidate() {
        let suffix = "so";
        assert!(is_candidate(Path::new("/ext/libln.so"), suffix));
        assert!(is_candidate(Path::new("/ext/LIBLN.SO"), suffix));
        assert!(!is_candidate(Path::new("/ext/.hidden.so"), suffix));
        assert!(!is_candidate(Path::new("/ext/libln.so~"), suffix));
        assert!(!is_candidate(Path::new("/ext/libln~1.so"), suffix));
        assert!(!is_candidate(Path::new("/ext/libln.tmp.so"), suffix));
        assert!(!is_candidate(Path::new("/ext/libln.bak.so"), suffix));
        assert!(!is_candidate(Path::new("/ext/readme.txt"), suffix));
        assert!(!is_candidate(Path::new("/ext/noext"), suffix));
    }

    #[test]
    fn test_scan_registers_all_names() {
        let mut fixture = Fixture::new();
        let path = fixture.add::<Twice>("twice");
        let mut discovery = fixture.discovery();
        let mut registry = OperationRegistry::new();

        let report = discovery.scan(fixture.dir.path(), &mut registry).unwrap();
        assert_eq!(report.loaded, vec![path]);
        assert!(report.failed.is_empty());

        assert_eq!(registry.list_names(), vec!["double", "twice"]);
        assert_eq!(discovery.list_names(), vec!["double", "twice"]);
        let module = discovery.lookup_by_name("DOUBLE").unwrap();
        assert!(module.is_active());
        assert_eq!(registry.lookup("twice").unwrap().execute(&[4.0]).unwrap(), 8.0);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let mut fixture = Fixture::new();
        fixture.add::<Twice>("twice");
        fixture.add::<Thrice>("thrice");
        let mut discovery = fixture.discovery();
        let mut registry = OperationRegistry::new();

        discovery.scan(fixture.dir.path(), &mut registry).unwrap();
        let names = registry.list_names();
        let before = discovery.lookup_by_name("twice").unwrap();

        let report = discovery.scan(fixture.dir.path(), &mut registry).unwrap();
        assert!(report.is_empty());
        assert_eq!(registry.list_names(), names);
        assert_eq!(discovery.len(), 2);
        assert!(Arc::ptr_eq(&before, &discovery.lookup_by_name("twice").unwrap()));
    }

    #[test]
    fn test_scan_ignores_non_candidates() {
        let mut fixture = Fixture::new();
        let suffix = native_extension_suffix();
        fixture.add_raw(&format!(".hidden.{}", suffix));
        fixture.add_raw(&format!("backup~.{}", suffix));
        fixture.add_raw(&format!("scratch.tmp.{}", suffix));
        fixture.add_raw(&format!("old.bak.{}", suffix));
        fixture.add_raw("notes.txt");
        std::fs::create_dir(fixture.dir.path().join(format!("nested.{}", suffix))).unwrap();

        let mut discovery = fixture.discovery();
        let mut registry = OperationRegistry::new();
        let report = discovery.scan(fixture.dir.path(), &mut registry).unwrap();

        assert!(report.is_empty());
        assert!(discovery.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bad_modules_do_not_abort_scan() {
        let mut fixture = Fixture::new();
        let unknown = fixture.file("aaa_unknown");
        File::create(&unknown).unwrap();
        let broken = fixture.add::<Broken>("broken");
        let good = fixture.add::<Thrice>("thrice");

        let mut discovery = fixture.discovery();
        let mut registry = OperationRegistry::new();
        let report = discovery.scan(fixture.dir.path(), &mut registry).unwrap();

        assert_eq!(report.loaded, vec![good]);
        let failed: Vec<&PathBuf> = report.failed.iter().map(|f| &f.path).collect();
        assert_eq!(failed, vec![&unknown, &broken]);
        assert!(report.failed[1].reason.contains("refusing to start"));
        assert!(!registry.exists("broken"));
        assert!(registry.exists("thrice"));
    }

    #[test]
    fn test_missing_directory_fails_scan() {
        let fixture = Fixture::new();
        let mut discovery = fixture.discovery();
        let mut registry = OperationRegistry::new();
        let err = discovery
            .scan(&fixture.dir.path().join("absent"), &mut registry)
            .unwrap_err();
        assert!(matches!(err, CalcError::ExtensionLoad { .. }));
    }

    #[test]
    fn test_case_collision_shadows_later_module() {
        let mut fixture = Fixture::new();
        let first = fixture.add::<Twice>("a_twice");
        let second = fixture.add::<TwiceAgain>("b_twice");

        let mut discovery = fixture.discovery();
        let mut registry = OperationRegistry::new();
        let report = discovery.scan(fixture.dir.path(), &mut registry).unwrap();

        assert_eq!(report.loaded, vec![first.clone()]);
        assert_eq!(report.shadowed, vec![second.clone()]);
        assert!(discovery.is_shadowed(&second));
        let shadowed = discovery.modules().find(|m| m.path() == second).unwrap();
        assert!(shadowed.is_active());
        assert_eq!(
            discovery.lookup_by_name("twice").unwrap().path(),
            first.as_path()
        );

        // Once the owner goes away the shadowed module takes over
        std::fs::remove_file(&first).unwrap();
        let report = discovery.refresh(&mut registry);
        assert_eq!(report.removed, vec![first]);
        assert_eq!(report.promoted, vec![second.clone()]);
        assert!(!registry.exists("double"));
        assert_eq!(
            discovery.lookup_by_name("twice").unwrap().path(),
            second.as_path()
        );
    }

    #[test]
    fn test_registration_is_all_or_nothing() {
        let mut fixture = Fixture::new();
        let path = fixture.add::<Thrice>("thrice");
        let mut registry = OperationRegistry::new();
        registry
            .register(
                "taken",
                Operation::Builtin(BuiltinOperation {
                    name: "taken",
                    kind: OperationKind::Function,
                    priority: 4,
                    arity: 1,
                    right_associative: false,
                    apply: identity,
                }),
            )
            .unwrap();

        let mut discovery = fixture.discovery();
        let report = discovery.scan(fixture.dir.path(), &mut registry).unwrap();
        assert_eq!(report.shadowed, vec![path]);
        assert_eq!(registry.list_names(), vec!["taken"]);
        assert!(discovery.lookup_by_name("thrice").is_none());
    }

    #[test]
    fn test_refresh_reloads_changed_module() {
        let mut fixture = Fixture::new();
        let path = fixture.add::<Thrice>("thrice");
        let mut discovery = fixture.discovery();
        let mut registry = OperationRegistry::new();
        discovery.scan(fixture.dir.path(), &mut registry).unwrap();
        let before = discovery.lookup_by_name("thrice").unwrap();

        assert!(discovery.refresh(&mut registry).is_empty());

        touch_later(&path);
        let report = discovery.refresh(&mut registry);
        assert_eq!(report.loaded, vec![path]);

        let after = discovery.lookup_by_name("thrice").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(!before.is_active());
        assert!(after.is_active());
        assert_eq!(registry.list_names(), vec!["taken", "thrice", "triple"]);
        assert!(registry
            .lookup("triple")
            .unwrap()
            .same_as(&Operation::Extension(after)));
    }

    #[test]
    fn test_shutdown_deactivates_and_unregisters() {
        let mut fixture = Fixture::new();
        fixture.add::<Twice>("twice");
        let mut discovery = fixture.discovery();
        let mut registry = OperationRegistry::new();
        discovery.scan(fixture.dir.path(), &mut registry).unwrap();
        let module = discovery.lookup_by_name("twice").unwrap();

        let cleanups = TWICE_CLEANUPS.load(Ordering::SeqCst);
        discovery.shutdown(&mut registry);
        drop(discovery);

        assert!(registry.is_empty());
        assert!(!module.is_active());
        assert!(TWICE_CLEANUPS.load(Ordering::SeqCst) >= cleanups + 1);
    }

    #[test]
    fn test_modified_time() {
        let fixture = Fixture::new();
        let path = fixture.file("present");
        assert!(modified_time(&path).is_none());
        File::create(&path).unwrap();
        assert!(modified_time(&path).is_some());
    }
}
