//! Writing extension modules in Rust
//!
//! Implement [`NativeExtension`] for a unit type and expand
//! [`export_extension!`](crate::export_extension) once in a `cdylib` crate:
//!
//! ```ignore
//! struct Ln;
//!
//! impl NativeExtension for Ln {
//!     const NAME: &'static str = "ln";
//!     const MIN_PARAMETERS: i32 = 1;
//!     const MAX_PARAMETERS: i32 = 1;
//!
//!     fn compute(args: &[f64]) -> Result<f64, String> {
//!         Ok(args[0].ln())
//!     }
//! }
//!
//! abacus_plugin::export_extension!(Ln);
//! ```
//!
//! The generated entry points never unwind into the host: panics inside
//! `compute`, `initialize` or `cleanup` are caught and reported as failures.

use crate::abi::{
    self, ComputeFn, ExtensionMeta, HostServices, EXTENSION_ABI_VERSION,
};
use crate::loader::ExportTable;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::ffi::c_void;
use std::os::raw::{c_char, c_int, c_uint};
use std::panic::catch_unwind;
use std::sync::{Mutex, OnceLock};

/// Error code for a computation that returned `Err`.
pub const COMPUTE_FAILED: c_int = 1;
/// Error code for a computation that panicked.
pub const COMPUTE_PANICKED: c_int = 2;

/// A computation exposed to the calculator.
pub trait NativeExtension: 'static {
    const NAME: &'static str;
    const ALIASES: &'static [&'static str] = &[];
    const MIN_PARAMETERS: i32;
    /// `-1` for no upper bound
    const MAX_PARAMETERS: i32;
    /// 0 binds loosest; only meaningful for operators
    const PRIORITY: u32 = 4;
    const OPERATOR: bool = false;
    const RIGHT_ASSOCIATIVE: bool = false;

    /// Called with an argument count already checked against the declared range.
    fn compute(args: &[f64]) -> Result<f64, String>;

    fn initialize(_host: &Host) -> Result<(), String> {
        Ok(())
    }

    fn cleanup() {}
}

/// Host services as seen from inside a module.
#[derive(Debug, Clone, Copy)]
pub struct Host {
    services: HostServices,
}

impl Host {
    pub fn log(&self, message: &str) {
        if let Some(write_log) = self.services.write_log {
            // SAFETY: the host reads exactly `message.len()` bytes.
            unsafe { write_log(message.as_ptr() as *const c_char, message.len()) };
        }
    }

    pub fn error(&self, message: &str) {
        if let Some(write_error) = self.services.write_error {
            // SAFETY: as above.
            unsafe { write_error(message.as_ptr() as *const c_char, message.len()) };
        }
    }
}

struct SharedMeta(&'static ExtensionMeta);

// SAFETY: the metadata and everything it points to is leaked and never mutated.
unsafe impl Send for SharedMeta {}
unsafe impl Sync for SharedMeta {}

/// Metadata for `T`, built on first use and kept for the life of the module.
pub fn metadata_for<T: NativeExtension>() -> &'static ExtensionMeta {
    // One table for every instantiation; statics are not per-monomorphization.
    static TABLE: OnceLock<Mutex<HashMap<TypeId, SharedMeta>>> = OnceLock::new();

    let table = TABLE.get_or_init(Default::default);
    let mut table = table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    table
        .entry(TypeId::of::<T>())
        .or_insert_with(|| SharedMeta(build_metadata::<T>()))
        .0
}

fn build_metadata<T: NativeExtension>() -> &'static ExtensionMeta {
    let (additional_names, additional_name_lengths) = if T::ALIASES.is_empty() {
        (std::ptr::null(), std::ptr::null())
    } else {
        let names: Box<[*const c_char]> = T::ALIASES
            .iter()
            .map(|alias| alias.as_ptr() as *const c_char)
            .collect();
        let lengths: Box<[usize]> = T::ALIASES.iter().map(|alias| alias.len()).collect();
        (
            Box::leak(names).as_ptr(),
            Box::leak(lengths).as_ptr(),
        )
    };

    Box::leak(Box::new(ExtensionMeta {
        abi_version: EXTENSION_ABI_VERSION,
        operation_name: T::NAME.as_ptr() as *const c_char,
        name_length: T::NAME.len(),
        compute: Some(compute_entry::<T> as ComputeFn),
        min_parameters: T::MIN_PARAMETERS,
        max_parameters: T::MAX_PARAMETERS,
        priority_level: T::PRIORITY as c_uint,
        is_operation: T::OPERATOR,
        right_to_left: T::RIGHT_ASSOCIATIVE,
        additional_names,
        additional_name_lengths,
        additional_name_count: T::ALIASES.len(),
    }))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("extension panicked: {}", detail),
        None => "extension panicked".to_string(),
    }
}

/// `get_extension_metadata` for `T`.
///
/// # Safety
/// `output` must be null or valid for a pointer write.
pub unsafe extern "C" fn metadata_entry<T: NativeExtension>(
    output: *mut *const ExtensionMeta,
) -> c_int {
    if output.is_null() {
        return 1;
    }
    match catch_unwind(metadata_for::<T>) {
        Ok(meta) => {
            *output = meta;
            0
        }
        Err(_) => 1,
    }
}

/// Computation entry point for `T`.
///
/// # Safety
/// `arguments` must be valid for `arg_count` reads; `error_code` and
/// `error_text` must be null or valid for writes of the advertised size.
pub unsafe extern "C" fn compute_entry<T: NativeExtension>(
    arg_count: usize,
    arguments: *const f64,
    error_code: *mut c_int,
    error_text: *mut c_char,
    error_buffer_size: usize,
) -> f64 {
    let args: &[f64] = if arguments.is_null() || arg_count == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(arguments, arg_count)
    };

    let (code, message) = match catch_unwind(|| T::compute(args)) {
        Ok(Ok(value)) => return value,
        Ok(Err(message)) => (COMPUTE_FAILED, message),
        Err(payload) => (COMPUTE_PANICKED, panic_message(payload)),
    };
    if !error_code.is_null() {
        *error_code = code;
    }
    abi::write_error_text(error_text, error_buffer_size, &message);
    0.0
}

/// `initialize_extension` for `T`.
///
/// # Safety
/// `services` must be null or point to a valid [`HostServices`];
/// `error_text` must be null or valid for `error_buffer_size` bytes.
pub unsafe extern "C" fn initialize_entry<T: NativeExtension>(
    services: *const HostServices,
    error_text: *mut c_char,
    error_buffer_size: usize,
) -> c_int {
    if services.is_null() {
        abi::write_error_text(error_text, error_buffer_size, "Host services not provided");
        return 1;
    }
    let host = Host {
        services: *services,
    };
    let message = match catch_unwind(|| T::initialize(&host)) {
        Ok(Ok(())) => return 0,
        Ok(Err(message)) => message,
        Err(payload) => panic_message(payload),
    };
    abi::write_error_text(error_text, error_buffer_size, &message);
    1
}

/// `cleanup_extension` for `T`.
///
/// # Safety
/// Called by the host at most once per successful initialization.
pub unsafe extern "C" fn cleanup_entry<T: NativeExtension>() {
    let _ = catch_unwind(T::cleanup);
}

/// The three exported entry points of `T`, for [`crate::InProcessLoader`].
pub fn export_table<T: NativeExtension>() -> ExportTable {
    ExportTable::new()
        .with_symbol(abi::METADATA_SYMBOL, metadata_entry::<T> as *const c_void)
        .with_symbol(abi::INITIALIZE_SYMBOL, initialize_entry::<T> as *const c_void)
        .with_symbol(abi::CLEANUP_SYMBOL, cleanup_entry::<T> as *const c_void)
}

/// Export the module entry points for a [`NativeExtension`] type.
#[macro_export]
macro_rules! export_extension {
    ($ty:ty) => {
        #[no_mangle]
        pub unsafe extern "C" fn get_extension_metadata(
            output: *mut *const $crate::abi::ExtensionMeta,
        ) -> ::std::os::raw::c_int {
            $crate::sdk::metadata_entry::<$ty>(output)
        }

        #[no_mangle]
        pub unsafe extern "C" fn initialize_extension(
            services: *const $crate::abi::HostServices,
            error_text: *mut ::std::os::raw::c_char,
            error_buffer_size: usize,
        ) -> ::std::os::raw::c_int {
            $crate::sdk::initialize_entry::<$ty>(services, error_text, error_buffer_size)
        }

        #[no_mangle]
        pub unsafe extern "C" fn cleanup_extension() {
            $crate::sdk::cleanup_entry::<$ty>()
        }
    };
}
