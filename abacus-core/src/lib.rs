//! Abacus Core - Fundamental types
//!
//! This crate provides the core types used throughout Abacus:
//! - `CalcError`: the error taxonomy of the calculation pipeline
//! - `codes`: machine-readable error codes
//! - numeric helpers for literal parsing and result normalization

mod error;
mod number;

pub use error::{codes, CalcError, ErrorReport, Stage};
pub use number::{format_number, normalize_zero, parse_literal};

/// Result alias used across the workspace
pub type CalcResult<T> = Result<T, CalcError>;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::codes;
    pub use crate::{CalcError, CalcResult, Stage};
}
