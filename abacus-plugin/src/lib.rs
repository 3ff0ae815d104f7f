//! Abacus Plugin System
//!
//! Everything the parser needs to know about operations, and everything the
//! host needs to load them from native extension modules:
//! - [`Operation`] and the [`OperationRegistry`] consulted while parsing
//! - [`ExtensionModule`], the only place raw module pointers are handled
//! - [`ExtensionDiscovery`], which scans a directory and keeps modules alive
//! - [`sdk`], for writing extension modules in Rust

pub mod abi;
mod discovery;
mod error;
mod extension;
mod host;
mod loader;
mod operation;
mod registry;
pub mod sdk;

pub use discovery::{is_candidate, modified_time, ExtensionDiscovery, ScanFailure, ScanReport};
pub use error::ExtensionError;
pub use extension::{ExtensionInfo, ExtensionMetadata, ExtensionModule, OperationCategory};
pub use host::{host_services, EXTENSION_LOG_TARGET};
pub use loader::{
    native_extension_suffix, ExportTable, InProcessLoader, LibLoader, ModuleLibrary, ModuleLoader,
};
pub use operation::{Arity, BuiltinFn, BuiltinOperation, Operation, OperationKind};
pub use registry::{standardize_name, OperationRegistry};

/// Re-export core types for extension and host authors
pub mod prelude {
    pub use crate::sdk::{Host, NativeExtension};
    pub use crate::{
        Arity, BuiltinOperation, ExtensionDiscovery, ExtensionError, ExtensionModule, Operation,
        OperationKind, OperationRegistry,
    };
    pub use abacus_core::prelude::*;
}
