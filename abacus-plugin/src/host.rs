//! Host services handed to extension modules

use crate::abi::HostServices;
use std::os::raw::c_char;

/// Log target for messages coming from extension modules.
pub const EXTENSION_LOG_TARGET: &str = "abacus::extension";

static HOST_SERVICES: HostServices = HostServices {
    write_log: Some(host_write_log),
    write_error: Some(host_write_error),
};

/// The process-wide services structure. Its address never changes, so modules
/// may keep the pointer they receive in `initialize_extension`.
pub fn host_services() -> &'static HostServices {
    &HOST_SERVICES
}

unsafe fn message_text(message: *const c_char, message_size: usize) -> Option<String> {
    if message.is_null() || message_size == 0 {
        return None;
    }
    let bytes = std::slice::from_raw_parts(message as *const u8, message_size);
    Some(String::from_utf8_lossy(bytes).into_owned())
}

unsafe extern "C" fn host_write_log(message: *const c_char, message_size: usize) {
    if let Some(text) = message_text(message, message_size) {
        tracing::info!(target: EXTENSION_LOG_TARGET, "{}", text);
    }
}

unsafe extern "C" fn host_write_error(message: *const c_char, message_size: usize) {
    if let Some(text) = message_text(message, message_size) {
        tracing::error!(target: EXTENSION_LOG_TARGET, "{}", text);
    }
}
