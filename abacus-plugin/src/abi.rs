//! Binary contract between the host and native extension modules
//!
//! Every type here is `#[repr(C)]` and must not change layout without bumping
//! [`EXTENSION_ABI_VERSION`]. A module exports three symbols:
//!
//! - `get_extension_metadata(ExtensionMeta**) -> int` (required)
//! - `initialize_extension(const HostServices*, char*, size_t) -> int` (optional)
//! - `cleanup_extension(void)` (optional)

use std::os::raw::{c_char, c_int, c_uint};

/// Host ABI version; modules declaring anything else are rejected.
pub const EXTENSION_ABI_VERSION: c_int = 1;

/// Capacity of every error-text buffer handed to a module.
pub const ERROR_MESSAGE_SIZE: usize = 256;

/// `max_parameters` value meaning "no upper bound".
pub const UNBOUNDED_PARAMETERS: c_int = -1;

/// Highest priority level a module may declare.
pub const MAX_PRIORITY_LEVEL: c_uint = 4;

pub const METADATA_SYMBOL: &str = "get_extension_metadata";
pub const INITIALIZE_SYMBOL: &str = "initialize_extension";
pub const CLEANUP_SYMBOL: &str = "cleanup_extension";

/// `(message, message_size)` callback offered by the host.
pub type HostCallback = unsafe extern "C" fn(message: *const c_char, message_size: usize);

/// Services the host offers to modules. Passed by a stable address that
/// outlives every module.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HostServices {
    pub write_log: Option<HostCallback>,
    pub write_error: Option<HostCallback>,
}

/// Computation entry point.
///
/// A non-zero `*error_code` marks failure; the module may then write a
/// NUL-terminated message of at most `error_buffer_size` bytes to `error_text`.
pub type ComputeFn = unsafe extern "C" fn(
    arg_count: usize,
    arguments: *const f64,
    error_code: *mut c_int,
    error_text: *mut c_char,
    error_buffer_size: usize,
) -> f64;

/// Metadata a module exposes through `get_extension_metadata`.
///
/// Names are length-delimited and need not be NUL-terminated. The structure
/// and everything it points to is owned by the module and must stay valid
/// while the module is loaded.
#[repr(C)]
#[derive(Debug)]
pub struct ExtensionMeta {
    pub abi_version: c_int,
    pub operation_name: *const c_char,
    pub name_length: usize,
    pub compute: Option<ComputeFn>,
    pub min_parameters: c_int,
    pub max_parameters: c_int,
    pub priority_level: c_uint,
    pub is_operation: bool,
    pub right_to_left: bool,
    pub additional_names: *const *const c_char,
    pub additional_name_lengths: *const usize,
    pub additional_name_count: usize,
}

pub type GetMetadataFn = unsafe extern "C" fn(output: *mut *const ExtensionMeta) -> c_int;

pub type InitializeFn = unsafe extern "C" fn(
    services: *const HostServices,
    error_text: *mut c_char,
    error_buffer_size: usize,
) -> c_int;

pub type CleanupFn = unsafe extern "C" fn();

/// Read a NUL-terminated message out of an error buffer.
///
/// Returns `None` when the module left the buffer empty.
pub fn read_error_text(buffer: &[c_char]) -> Option<String> {
    let bytes: Vec<u8> = buffer
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    let text = String::from_utf8_lossy(&bytes).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Copy `message` into a module-facing buffer, truncating and always
/// NUL-terminating.
///
/// # Safety
/// `buffer` must be null or valid for `capacity` bytes of writes.
pub unsafe fn write_error_text(buffer: *mut c_char, capacity: usize, message: &str) {
    if buffer.is_null() || capacity == 0 {
        return;
    }
    let bytes = message.as_bytes();
    let len = bytes.len().min(capacity - 1);
    std::ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, buffer, len);
    *buffer.add(len) = 0;
}
