//! One loaded native extension module
//!
//! All raw-pointer and struct-layout handling lives here. Metadata is copied
//! into owned Rust values at load time; afterwards only the entry points are
//! kept, and they are only ever called through [`ExtensionModule::activate`],
//! [`ExtensionModule::deactivate`] and [`ExtensionModule::compute`].

use crate::abi::{
    self, CleanupFn, ComputeFn, ExtensionMeta, GetMetadataFn, HostServices, InitializeFn,
    ERROR_MESSAGE_SIZE, EXTENSION_ABI_VERSION, MAX_PRIORITY_LEVEL, UNBOUNDED_PARAMETERS,
};
use crate::discovery::modified_time;
use crate::loader::{ModuleLibrary, ModuleLoader};
use crate::operation::Arity;
use crate::registry::standardize_name;
use crate::ExtensionError;
use serde::Serialize;
use std::fmt;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

// Hostile metadata guards
const MAX_NAME_LENGTH: usize = 256;
const MAX_ALTERNATE_NAMES: usize = 64;

/// Shape of an extension as the parser sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationCategory {
    TwoOperand,
    SingleOperand,
    MathFunction,
}

/// Validated copy of a module's metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionMetadata {
    pub primary_name: String,
    pub alternate_names: Vec<String>,
    pub min_parameters: usize,
    pub max_parameters: Option<usize>,
    pub priority_level: u32,
    pub operator_like: bool,
    pub right_associative: bool,
}

/// Serializable summary of a loaded module
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionInfo {
    pub name: String,
    pub aliases: Vec<String>,
    pub path: PathBuf,
    pub arity: Arity,
    pub priority: u8,
    pub category: OperationCategory,
    pub right_associative: bool,
    pub active: bool,
}

pub struct ExtensionModule {
    path: PathBuf,
    metadata: ExtensionMetadata,
    standardized_name: String,
    modified: Option<SystemTime>,
    active: AtomicBool,
    compute_fn: ComputeFn,
    initialize_fn: Option<InitializeFn>,
    cleanup_fn: Option<CleanupFn>,
    // Dropped last: every entry point above points into it.
    _library: Box<dyn ModuleLibrary>,
}

impl ExtensionModule {
    /// Open `path`, resolve its entry points and validate its metadata.
    pub fn load(loader: &dyn ModuleLoader, path: &Path) -> Result<Self, ExtensionError> {
        let library = loader.open(path)?;

        let get_metadata = library
            .symbol(abi::METADATA_SYMBOL)
            .ok_or_else(|| ExtensionError::MissingSymbol {
                path: path.to_path_buf(),
                symbol: abi::METADATA_SYMBOL,
            })?;
        // SAFETY: the ABI fixes the signature of each exported symbol.
        let get_metadata: GetMetadataFn = unsafe { std::mem::transmute(get_metadata) };
        let initialize_fn: Option<InitializeFn> = library
            .symbol(abi::INITIALIZE_SYMBOL)
            .map(|address| unsafe { std::mem::transmute(address) });
        let cleanup_fn: Option<CleanupFn> = library
            .symbol(abi::CLEANUP_SYMBOL)
            .map(|address| unsafe { std::mem::transmute(address) });

        let mut raw: *const ExtensionMeta = std::ptr::null();
        // SAFETY: the module writes a pointer to metadata it owns.
        let status = unsafe { get_metadata(&mut raw) };
        if status != 0 || raw.is_null() {
            return Err(ExtensionError::MalformedMetadata(format!(
                "{} returned status {} for {}",
                abi::METADATA_SYMBOL,
                status,
                path.display()
            )));
        }

        // SAFETY: non-null, owned by the still-loaded module.
        let (metadata, compute_fn) = unsafe { decode_metadata(&*raw)? };
        let standardized_name = standardize_name(&metadata.primary_name);

        let modified = modified_time(path);

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            standardized_name,
            modified,
            active: AtomicBool::new(false),
            compute_fn,
            initialize_fn,
            cleanup_fn,
            _library: library,
        })
    }

    /// Run the module's setup entry point, handing it the host services.
    ///
    /// Activating an already-active module fails without calling into it.
    pub fn activate(&self, services: &'static HostServices) -> Result<(), ExtensionError> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(ExtensionError::AlreadyActive(self.standardized_name.clone()));
        }

        if let Some(initialize) = self.initialize_fn {
            let mut buffer = [0 as c_char; ERROR_MESSAGE_SIZE];
            // SAFETY: `services` is 'static and the buffer is ERROR_MESSAGE_SIZE bytes.
            let status = unsafe { initialize(services, buffer.as_mut_ptr(), ERROR_MESSAGE_SIZE) };
            if status != 0 {
                self.active.store(false, Ordering::SeqCst);
                return Err(ExtensionError::Activation {
                    name: self.standardized_name.clone(),
                    message: abi::read_error_text(&buffer)
                        .unwrap_or_else(|| format!("{} failed", abi::INITIALIZE_SYMBOL)),
                });
            }
        }
        Ok(())
    }

    /// Run the module's cleanup entry point once per activation.
    pub fn deactivate(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            if let Some(cleanup) = self.cleanup_fn {
                // SAFETY: no arguments; the module must not unwind across the boundary.
                unsafe { cleanup() };
            }
        }
    }

    /// Call the computation entry point.
    ///
    /// The argument count is checked against the declared range before the
    /// call. A non-zero error code becomes [`ExtensionError::Compute`].
    pub fn compute(&self, args: &[f64]) -> Result<f64, ExtensionError> {
        if !self.is_active() {
            return Err(ExtensionError::Inactive(self.standardized_name.clone()));
        }
        let range = self.parameter_range();
        if !range.accepts(args.len()) {
            return Err(ExtensionError::ArityMismatch {
                name: self.standardized_name.clone(),
                expected: range.to_string(),
                got: args.len(),
            });
        }

        let mut error_code: c_int = 0;
        let mut buffer = [0 as c_char; ERROR_MESSAGE_SIZE];
        // SAFETY: `args` is valid for `args.len()` reads, the code and buffer
        // are valid for writes of the advertised size.
        let result = unsafe {
            (self.compute_fn)(
                args.len(),
                args.as_ptr(),
                &mut error_code,
                buffer.as_mut_ptr(),
                ERROR_MESSAGE_SIZE,
            )
        };

        if error_code != 0 {
            return Err(ExtensionError::Compute {
                name: self.standardized_name.clone(),
                message: abi::read_error_text(&buffer)
                    .unwrap_or_else(|| "Extension computation failed".to_string()),
            });
        }
        Ok(result)
    }

    pub fn primary_name(&self) -> &str {
        &self.metadata.primary_name
    }

    /// Primary name, trimmed and lower-cased.
    pub fn standardized_name(&self) -> &str {
        &self.standardized_name
    }

    /// Primary name followed by the alternates, as declared.
    pub fn all_names(&self) -> Vec<String> {
        std::iter::once(self.metadata.primary_name.clone())
            .chain(self.metadata.alternate_names.iter().cloned())
            .collect()
    }

    pub fn parameter_range(&self) -> Arity {
        Arity {
            min: self.metadata.min_parameters,
            max: self.metadata.max_parameters,
        }
    }

    /// Declared priority for operator-like modules (capped at 4); functions
    /// always sit at the top level.
    pub fn priority(&self) -> u8 {
        if self.metadata.operator_like {
            self.metadata.priority_level.min(MAX_PRIORITY_LEVEL) as u8
        } else {
            MAX_PRIORITY_LEVEL as u8
        }
    }

    pub fn is_operator_like(&self) -> bool {
        self.metadata.operator_like
    }

    pub fn is_right_associative(&self) -> bool {
        self.metadata.right_associative
    }

    pub fn category(&self) -> OperationCategory {
        let range = self.parameter_range();
        match (self.metadata.operator_like, range.min, range.max) {
            (true, 1, Some(1)) => OperationCategory::SingleOperand,
            (true, 2, Some(2)) => OperationCategory::TwoOperand,
            _ => OperationCategory::MathFunction,
        }
    }

    pub fn metadata(&self) -> &ExtensionMetadata {
        &self.metadata
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File modification time recorded at load.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn info(&self) -> ExtensionInfo {
        ExtensionInfo {
            name: self.standardized_name.clone(),
            aliases: self
                .metadata
                .alternate_names
                .iter()
                .map(|n| standardize_name(n))
                .collect(),
            path: self.path.clone(),
            arity: self.parameter_range(),
            priority: self.priority(),
            category: self.category(),
            right_associative: self.is_right_associative(),
            active: self.is_active(),
        }
    }
}

impl Drop for ExtensionModule {
    fn drop(&mut self) {
        self.deactivate();
    }
}

impl fmt::Debug for ExtensionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionModule")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Copy a length-delimited name out of module memory.
unsafe fn read_name(ptr: *const c_char, len: usize, what: &str) -> Result<String, ExtensionError> {
    if ptr.is_null() || len == 0 {
        return Err(ExtensionError::MalformedMetadata(format!("{} is empty", what)));
    }
    if len > MAX_NAME_LENGTH {
        return Err(ExtensionError::MalformedMetadata(format!(
            "{} is longer than {} bytes",
            what, MAX_NAME_LENGTH
        )));
    }
    let bytes = std::slice::from_raw_parts(ptr as *const u8, len);
    let name = std::str::from_utf8(bytes)
        .map_err(|_| ExtensionError::MalformedMetadata(format!("{} is not valid UTF-8", what)))?;
    if name.trim().is_empty() {
        return Err(ExtensionError::MalformedMetadata(format!("{} is blank", what)));
    }
    Ok(name.to_string())
}

/// Validate raw metadata and copy it into owned values.
unsafe fn decode_metadata(
    meta: &ExtensionMeta,
) -> Result<(ExtensionMetadata, ComputeFn), ExtensionError> {
    if meta.abi_version != EXTENSION_ABI_VERSION {
        return Err(ExtensionError::AbiMismatch {
            expected: EXTENSION_ABI_VERSION,
            found: meta.abi_version,
        });
    }

    let primary_name = read_name(meta.operation_name, meta.name_length, "operation name")?;

    let compute = meta.compute.ok_or_else(|| {
        ExtensionError::MalformedMetadata(format!("{} has no compute function", primary_name))
    })?;

    if meta.min_parameters < 0 {
        return Err(ExtensionError::MalformedMetadata(format!(
            "{}: negative minimum parameter count {}",
            primary_name, meta.min_parameters
        )));
    }
    let max_parameters = if meta.max_parameters == UNBOUNDED_PARAMETERS {
        None
    } else if meta.max_parameters < meta.min_parameters {
        return Err(ExtensionError::MalformedMetadata(format!(
            "{}: maximum parameter count {} is below minimum {}",
            primary_name, meta.max_parameters, meta.min_parameters
        )));
    } else {
        Some(meta.max_parameters as usize)
    };

    let mut alternate_names = Vec::with_capacity(meta.additional_name_count.min(MAX_ALTERNATE_NAMES));
    if meta.additional_name_count > 0 {
        if meta.additional_name_count > MAX_ALTERNATE_NAMES {
            return Err(ExtensionError::MalformedMetadata(format!(
                "{}: {} alternate names exceeds the limit of {}",
                primary_name, meta.additional_name_count, MAX_ALTERNATE_NAMES
            )));
        }
        if meta.additional_names.is_null() || meta.additional_name_lengths.is_null() {
            return Err(ExtensionError::MalformedMetadata(format!(
                "{}: alternate name arrays are missing",
                primary_name
            )));
        }
        let names = std::slice::from_raw_parts(meta.additional_names, meta.additional_name_count);
        let lengths =
            std::slice::from_raw_parts(meta.additional_name_lengths, meta.additional_name_count);
        for (i, (&ptr, &len)) in names.iter().zip(lengths).enumerate() {
            alternate_names.push(read_name(ptr, len, &format!("alternate name #{}", i))?);
        }
    }

    let metadata = ExtensionMetadata {
        primary_name,
        alternate_names,
        min_parameters: meta.min_parameters as usize,
        max_parameters,
        priority_level: meta.priority_level,
        operator_like: meta.is_operation,
        right_associative: meta.right_to_left,
    };
    Ok((metadata, compute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::host_services;
    use crate::loader::{ExportTable, InProcessLoader};
    use crate::sdk::{self, Host, NativeExtension};
    use std::ffi::c_void;
    use std::sync::atomic::AtomicUsize;

    struct Square;

    impl NativeExtension for Square {
        const NAME: &'static str = "Square";
        const ALIASES: &'static [&'static str] = &["sq"];
        const MIN_PARAMETERS: i32 = 1;
        const MAX_PARAMETERS: i32 = 1;

        fn compute(args: &[f64]) -> Result<f64, String> {
            Ok(args[0] * args[0])
        }
    }

    struct Picky;

    impl NativeExtension for Picky {
        const NAME: &'static str = "picky";
        const MIN_PARAMETERS: i32 = 1;
        const MAX_PARAMETERS: i32 = -1;

        fn compute(args: &[f64]) -> Result<f64, String> {
            if args.iter().any(|a| *a < 0.0) {
                return Err("negative input rejected".to_string());
            }
            Ok(args.iter().sum())
        }
    }

    struct Refuses;

    impl NativeExtension for Refuses {
        const NAME: &'static str = "refuses";
        const MIN_PARAMETERS: i32 = 0;
        const MAX_PARAMETERS: i32 = 0;

        fn compute(_args: &[f64]) -> Result<f64, String> {
            Ok(0.0)
        }

        fn initialize(_host: &Host) -> Result<(), String> {
            Err("license check failed".to_string())
        }
    }

    static CLEANUPS: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl NativeExtension for Counted {
        const NAME: &'static str = "counted";
        const MIN_PARAMETERS: i32 = 0;
        const MAX_PARAMETERS: i32 = 0;

        fn compute(_args: &[f64]) -> Result<f64, String> {
            Ok(1.0)
        }

        fn cleanup() {
            CLEANUPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn load_exports(exports: ExportTable) -> Result<ExtensionModule, ExtensionError> {
        let loader = InProcessLoader::new().with_module("/ext/module.so", exports);
        ExtensionModule::load(&loader, Path::new("/ext/module.so"))
    }

    fn load<T: NativeExtension>() -> ExtensionModule {
        load_exports(sdk::export_table::<T>()).unwrap()
    }

    // Hand-written hostile modules

    unsafe extern "C" fn noop_compute(
        _arg_count: usize,
        _arguments: *const f64,
        _error_code: *mut c_int,
        _error_text: *mut c_char,
        _error_buffer_size: usize,
    ) -> f64 {
        0.0
    }

    unsafe extern "C" fn silent_failure(
        _arg_count: usize,
        _arguments: *const f64,
        error_code: *mut c_int,
        _error_text: *mut c_char,
        _error_buffer_size: usize,
    ) -> f64 {
        *error_code = 7;
        0.0
    }

    struct RawMeta(ExtensionMeta);
    unsafe impl Sync for RawMeta {}

    const NAME: &[u8] = b"raw";
    struct Names([*const c_char; 2]);
    unsafe impl Sync for Names {}
    static ALT_PTRS: Names = Names([b"ok".as_ptr() as *const c_char, std::ptr::null()]);
    static ALT_LENGTHS: [usize; 2] = [2, 0];

    const fn base_meta() -> ExtensionMeta {
        ExtensionMeta {
            abi_version: EXTENSION_ABI_VERSION,
            operation_name: NAME.as_ptr() as *const c_char,
            name_length: NAME.len(),
            compute: Some(noop_compute),
            min_parameters: 1,
            max_parameters: 1,
            priority_level: 4,
            is_operation: false,
            right_to_left: false,
            additional_names: std::ptr::null(),
            additional_name_lengths: std::ptr::null(),
            additional_name_count: 0,
        }
    }

    static WRONG_ABI: RawMeta = RawMeta(ExtensionMeta { abi_version: 2, ..base_meta() });
    static NO_COMPUTE: RawMeta = RawMeta(ExtensionMeta { compute: None, ..base_meta() });
    static NO_NAME: RawMeta = RawMeta(ExtensionMeta { name_length: 0, ..base_meta() });
    static NEGATIVE_MIN: RawMeta = RawMeta(ExtensionMeta { min_parameters: -1, ..base_meta() });
    static INVERTED_RANGE: RawMeta =
        RawMeta(ExtensionMeta { min_parameters: 3, max_parameters: 2, ..base_meta() });
    static EMPTY_ALIAS: RawMeta = RawMeta(ExtensionMeta {
        additional_names: &ALT_PTRS.0 as *const [*const c_char; 2] as *const *const c_char,
        additional_name_lengths: &ALT_LENGTHS as *const [usize; 2] as *const usize,
        additional_name_count: 2,
        ..base_meta()
    });
    static MISSING_ALIAS_ARRAYS: RawMeta =
        RawMeta(ExtensionMeta { additional_name_count: 1, ..base_meta() });
    static SILENT: RawMeta = RawMeta(ExtensionMeta { compute: Some(silent_failure), ..base_meta() });

    macro_rules! raw_module {
        ($fn_name:ident, $meta:expr) => {
            unsafe extern "C" fn $fn_name(output: *mut *const ExtensionMeta) -> c_int {
                *output = &$meta.0;
                0
            }
        };
    }

    raw_module!(wrong_abi, WRONG_ABI);
    raw_module!(no_compute, NO_COMPUTE);
    raw_module!(no_name, NO_NAME);
    raw_module!(negative_min, NEGATIVE_MIN);
    raw_module!(inverted_range, INVERTED_RANGE);
    raw_module!(empty_alias, EMPTY_ALIAS);
    raw_module!(missing_alias_arrays, MISSING_ALIAS_ARRAYS);
    raw_module!(silent, SILENT);

    unsafe extern "C" fn failing_metadata(_output: *mut *const ExtensionMeta) -> c_int {
        1
    }

    fn raw_exports(entry: GetMetadataFn) -> ExportTable {
        ExportTable::new().with_symbol(abi::METADATA_SYMBOL, entry as *const c_void)
    }

    #[test]
    fn test_load_reads_metadata() {
        let module = load::<Square>();
        assert_eq!(module.primary_name(), "Square");
        assert_eq!(module.standardized_name(), "square");
        assert_eq!(module.all_names(), vec!["Square".to_string(), "sq".to_string()]);
        assert_eq!(module.parameter_range(), Arity::exact(1));
        assert_eq!(module.priority(), 4);
        assert!(!module.is_operator_like());
        assert_eq!(module.category(), OperationCategory::MathFunction);
        assert!(!module.is_active());
    }

    #[test]
    fn test_compute_requires_activation() {
        let module = load::<Square>();
        assert!(matches!(module.compute(&[3.0]), Err(ExtensionError::Inactive(_))));
        module.activate(host_services()).unwrap();
        assert_eq!(module.compute(&[3.0]).unwrap(), 9.0);
    }

    #[test]
    fn test_compute_checks_arity_before_call() {
        let module = load::<Square>();
        module.activate(host_services()).unwrap();
        for args in [&[][..], &[1.0, 2.0][..]] {
            let err = module.compute(args).unwrap_err();
            assert!(
                matches!(err, ExtensionError::ArityMismatch { got, .. } if got == args.len()),
                "unexpected {:?}",
                err
            );
        }
    }

    #[test]
    fn test_unbounded_arity() {
        let module = load::<Picky>();
        module.activate(host_services()).unwrap();
        assert_eq!(module.parameter_range(), Arity::at_least(1));
        assert_eq!(module.compute(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 10.0);
    }

    #[test]
    fn test_compute_error_carries_module_text() {
        let module = load::<Picky>();
        module.activate(host_services()).unwrap();
        let err = module.compute(&[1.0, -1.0]).unwrap_err();
        assert_eq!(
            err,
            ExtensionError::Compute {
                name: "picky".to_string(),
                message: "negative input rejected".to_string()
            }
        );
    }

    #[test]
    fn test_compute_error_without_text_gets_generic_message() {
        let module = load_exports(raw_exports(silent)).unwrap();
        module.activate(host_services()).unwrap();
        match module.compute(&[1.0]).unwrap_err() {
            ExtensionError::Compute { message, .. } => {
                assert_eq!(message, "Extension computation failed")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_activation_failure_reports_module_text() {
        let module = load::<Refuses>();
        let err = module.activate(host_services()).unwrap_err();
        assert_eq!(
            err,
            ExtensionError::Activation {
                name: "refuses".to_string(),
                message: "license check failed".to_string()
            }
        );
        assert!(!module.is_active());
    }

    #[test]
    fn test_double_activation_is_refused() {
        let module = load::<Square>();
        module.activate(host_services()).unwrap();
        assert!(matches!(
            module.activate(host_services()),
            Err(ExtensionError::AlreadyActive(_))
        ));
        assert!(module.is_active());
    }

    #[test]
    fn test_cleanup_runs_once() {
        let before = CLEANUPS.load(Ordering::SeqCst);
        let module = load::<Counted>();
        module.activate(host_services()).unwrap();
        module.deactivate();
        module.deactivate();
        drop(module);
        assert_eq!(CLEANUPS.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_inactive_module_drop_skips_cleanup() {
        let before = CLEANUPS.load(Ordering::SeqCst);
        drop(load::<Counted>());
        assert_eq!(CLEANUPS.load(Ordering::SeqCst), before);
    }

    #[test]
    fn test_missing_metadata_symbol() {
        let exports = sdk::export_table::<Square>().without_symbol(abi::METADATA_SYMBOL);
        let err = load_exports(exports).unwrap_err();
        assert!(matches!(err, ExtensionError::MissingSymbol { .. }));
    }

    #[test]
    fn test_lifecycle_symbols_are_optional() {
        let exports = sdk::export_table::<Square>()
            .without_symbol(abi::INITIALIZE_SYMBOL)
            .without_symbol(abi::CLEANUP_SYMBOL);
        let module = load_exports(exports).unwrap();
        module.activate(host_services()).unwrap();
        assert_eq!(module.compute(&[4.0]).unwrap(), 16.0);
    }

    #[test]
    fn test_metadata_entry_failure() {
        let err = load_exports(raw_exports(failing_metadata)).unwrap_err();
        assert!(matches!(err, ExtensionError::MalformedMetadata(_)));
    }

    #[test]
    fn test_abi_mismatch() {
        let err = load_exports(raw_exports(wrong_abi)).unwrap_err();
        assert_eq!(err, ExtensionError::AbiMismatch { expected: 1, found: 2 });
    }

    #[test]
    fn test_malformed_metadata_rejected() {
        let cases: [(&str, GetMetadataFn); 6] = [
            ("no compute", no_compute),
            ("no name", no_name),
            ("negative min", negative_min),
            ("inverted range", inverted_range),
            ("empty alias", empty_alias),
            ("missing alias arrays", missing_alias_arrays),
        ];
        for (label, entry) in cases {
            let err = load_exports(raw_exports(entry)).unwrap_err();
            assert!(
                matches!(err, ExtensionError::MalformedMetadata(_)),
                "{}: unexpected {:?}",
                label,
                err
            );
        }
    }

    #[test]
    fn test_category_derivation() {
        struct Neg;
        impl NativeExtension for Neg {
            const NAME: &'static str = "neg";
            const MIN_PARAMETERS: i32 = 1;
            const MAX_PARAMETERS: i32 = 1;
            const OPERATOR: bool = true;
            fn compute(args: &[f64]) -> Result<f64, String> {
                Ok(-args[0])
            }
        }
        struct Modulo;
        impl NativeExtension for Modulo {
            const NAME: &'static str = "mod";
            const MIN_PARAMETERS: i32 = 2;
            const MAX_PARAMETERS: i32 = 2;
            const PRIORITY: u32 = 9;
            const OPERATOR: bool = true;
            fn compute(args: &[f64]) -> Result<f64, String> {
                Ok(args[0] % args[1])
            }
        }
        struct Spread;
        impl NativeExtension for Spread {
            const NAME: &'static str = "spread";
            const MIN_PARAMETERS: i32 = 2;
            const MAX_PARAMETERS: i32 = 3;
            const OPERATOR: bool = true;
            fn compute(_args: &[f64]) -> Result<f64, String> {
                Ok(0.0)
            }
        }

        assert_eq!(load::<Neg>().category(), OperationCategory::SingleOperand);
        let modulo = load::<Modulo>();
        assert_eq!(modulo.category(), OperationCategory::TwoOperand);
        assert_eq!(modulo.priority(), 4);
        assert_eq!(load::<Spread>().category(), OperationCategory::MathFunction);
    }

    #[test]
    fn test_info_snapshot() {
        let module = load::<Square>();
        module.activate(host_services()).unwrap();
        let info = module.info();
        assert_eq!(info.name, "square");
        assert_eq!(info.aliases, vec!["sq".to_string()]);
        assert!(info.active);
        assert_eq!(info.path, PathBuf::from("/ext/module.so"));
    }
}
