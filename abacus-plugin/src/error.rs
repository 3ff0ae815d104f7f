//! Errors raised at the extension boundary

use abacus_core::CalcError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtensionError {
    #[error("failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("{}: required symbol '{symbol}' not found", path.display())]
    MissingSymbol { path: PathBuf, symbol: &'static str },

    #[error("ABI version mismatch: host expects {expected}, module declares {found}")]
    AbiMismatch { expected: i32, found: i32 },

    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("{name} failed to activate: {message}")]
    Activation { name: String, message: String },

    #[error("{0} is already active")]
    AlreadyActive(String),

    #[error("{0} is not active")]
    Inactive(String),

    #[error("{name} expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("{name}: {message}")]
    Compute { name: String, message: String },
}

impl From<ExtensionError> for CalcError {
    fn from(err: ExtensionError) -> Self {
        match err {
            ExtensionError::Load { path, reason } => CalcError::ExtensionLoad {
                path: path.display().to_string(),
                reason,
            },
            ExtensionError::MissingSymbol { path, symbol } => CalcError::ExtensionLoad {
                path: path.display().to_string(),
                reason: format!("required symbol '{}' not found", symbol),
            },
            e @ (ExtensionError::AbiMismatch { .. } | ExtensionError::MalformedMetadata(_)) => {
                CalcError::ExtensionAbi(e.to_string())
            }
            ExtensionError::Activation { name, message } => {
                CalcError::ExtensionActivation { name, message }
            }
            ExtensionError::AlreadyActive(name) => CalcError::ExtensionActivation {
                name,
                message: "already active".to_string(),
            },
            ExtensionError::Inactive(name) => CalcError::ExtensionCompute {
                name,
                message: "extension is not active".to_string(),
            },
            ExtensionError::ArityMismatch { name, expected, got } => {
                CalcError::arity(name, expected, got)
            }
            ExtensionError::Compute { name, message } => {
                CalcError::ExtensionCompute { name, message }
            }
        }
    }
}
