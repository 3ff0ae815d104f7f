//! Structured calculation errors
//!
//! Every failure of a `calculate` call is one of these variants. Parse-time
//! errors abort before any evaluation starts; evaluation-time errors abort the
//! whole expression. There is never a partial result.

use serde::Serialize;
use thiserror::Error;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const EMPTY_EXPRESSION: &str = "EMPTY_EXPRESSION";
    pub const INVALID_CHARACTER: &str = "INVALID_CHARACTER";
    pub const INVALID_NUMBER: &str = "INVALID_NUMBER";
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const UNKNOWN_TOKEN: &str = "UNKNOWN_TOKEN";
    pub const UNPROCESSED_TOKENS: &str = "UNPROCESSED_TOKENS";
    pub const UNBALANCED_PARENS: &str = "UNBALANCED_PARENS";
    pub const MISSING_OPERATOR: &str = "MISSING_OPERATOR";
    pub const NESTING_TOO_DEEP: &str = "NESTING_TOO_DEEP";
    pub const ARG_COUNT: &str = "ARG_COUNT";
    pub const DIV_ZERO: &str = "DIV_ZERO";
    pub const DOMAIN_ERROR: &str = "DOMAIN_ERROR";
    pub const DUPLICATE_NAME: &str = "DUPLICATE_NAME";
    pub const INVALID_OPERATION: &str = "INVALID_OPERATION";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const EXTENSION_LOAD: &str = "EXTENSION_LOAD";
    pub const EXTENSION_ABI: &str = "EXTENSION_ABI";
    pub const EXTENSION_ACTIVATION: &str = "EXTENSION_ACTIVATION";
    pub const EXTENSION_COMPUTE: &str = "EXTENSION_COMPUTE";
}

/// Phase of the pipeline an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Tokenizing or building the AST
    Parse,
    /// Walking the AST
    Evaluate,
    /// Registry or extension lifecycle
    Setup,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("Empty expression")]
    EmptyExpression,

    #[error("Invalid character '{ch}' at position {position}")]
    InvalidCharacter { ch: char, position: usize },

    #[error("Invalid number format: {0}")]
    InvalidNumber(String),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unknown token: {0}")]
    UnknownToken(String),

    #[error("Unprocessed tokens in expression, first offending token: '{0}'")]
    UnprocessedTokens(String),

    #[error("Unbalanced parentheses: {0}")]
    UnbalancedParentheses(String),

    #[error("Expected '(' after function {0}")]
    MissingFunctionParenthesis(String),

    #[error("Expected ')' to close call to {0}")]
    UnclosedFunctionCall(String),

    #[error("Expression nested deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("Required operation '{0}' is not registered")]
    MissingOperator(String),

    #[error("{operation} expects {expected} argument(s), got {got}")]
    ArityMismatch {
        operation: String,
        expected: String,
        got: usize,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Operation '{0}' is already registered")]
    DuplicateName(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to load extension {path}: {reason}")]
    ExtensionLoad { path: String, reason: String },

    #[error("Extension ABI error: {0}")]
    ExtensionAbi(String),

    #[error("Extension {name} failed to activate: {message}")]
    ExtensionActivation { name: String, message: String },

    #[error("Extension error in {name}: {message}")]
    ExtensionCompute { name: String, message: String },

    #[error("Evaluation of '{operation}' failed: {source}")]
    Evaluation {
        operation: String,
        #[source]
        source: Box<CalcError>,
    },
}

impl CalcError {
    pub fn arity(operation: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        Self::ArityMismatch {
            operation: operation.into(),
            expected: expected.into(),
            got,
        }
    }

    pub fn domain(details: impl Into<String>) -> Self {
        Self::Domain(details.into())
    }

    /// Wrap the failure of an operation's `execute`.
    pub fn evaluation(operation: impl Into<String>, cause: CalcError) -> Self {
        Self::Evaluation {
            operation: operation.into(),
            source: Box::new(cause),
        }
    }

    /// The original cause, looking through `Evaluation` wrappers.
    pub fn root(&self) -> &CalcError {
        match self {
            CalcError::Evaluation { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.root() {
            CalcError::EmptyExpression => codes::EMPTY_EXPRESSION,
            CalcError::InvalidCharacter { .. } => codes::INVALID_CHARACTER,
            CalcError::InvalidNumber(_) => codes::INVALID_NUMBER,
            CalcError::UnexpectedEnd
            | CalcError::MissingFunctionParenthesis(_)
            | CalcError::UnclosedFunctionCall(_) => codes::PARSE_ERROR,
            CalcError::UnknownToken(_) => codes::UNKNOWN_TOKEN,
            CalcError::UnprocessedTokens(_) => codes::UNPROCESSED_TOKENS,
            CalcError::UnbalancedParentheses(_) => codes::UNBALANCED_PARENS,
            CalcError::MissingOperator(_) => codes::MISSING_OPERATOR,
            CalcError::NestingTooDeep(_) => codes::NESTING_TOO_DEEP,
            CalcError::ArityMismatch { .. } => codes::ARG_COUNT,
            CalcError::DivisionByZero => codes::DIV_ZERO,
            CalcError::Domain(_) => codes::DOMAIN_ERROR,
            CalcError::DuplicateName(_) => codes::DUPLICATE_NAME,
            CalcError::InvalidOperation(_) => codes::INVALID_OPERATION,
            CalcError::NotFound(_) => codes::NOT_FOUND,
            CalcError::ExtensionLoad { .. } => codes::EXTENSION_LOAD,
            CalcError::ExtensionAbi(_) => codes::EXTENSION_ABI,
            CalcError::ExtensionActivation { .. } => codes::EXTENSION_ACTIVATION,
            CalcError::ExtensionCompute { .. } => codes::EXTENSION_COMPUTE,
            // root() never yields a wrapper
            CalcError::Evaluation { .. } => codes::EXTENSION_COMPUTE,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            CalcError::Evaluation { .. }
            | CalcError::DivisionByZero
            | CalcError::Domain(_)
            | CalcError::ExtensionCompute { .. } => Stage::Evaluate,
            CalcError::DuplicateName(_)
            | CalcError::InvalidOperation(_)
            | CalcError::NotFound(_)
            | CalcError::ExtensionLoad { .. }
            | CalcError::ExtensionAbi(_)
            | CalcError::ExtensionActivation { .. } => Stage::Setup,
            _ => Stage::Parse,
        }
    }

    /// Short hint for a human reading the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self.root() {
            CalcError::UnknownToken(_) => Some("Use /list to see available operations"),
            CalcError::UnbalancedParentheses(_) => Some("Check that every '(' has a matching ')'"),
            CalcError::DivisionByZero => Some("Ensure divisor is not zero"),
            CalcError::MissingOperator(_) => Some("The builtin operation table is incomplete"),
            CalcError::NestingTooDeep(_) => Some("Split the expression into smaller parts"),
            CalcError::ExtensionAbi(_) => Some("Rebuild the extension against the current host ABI"),
            _ => None,
        }
    }
}

/// Serializable view of an error for reports and listings
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub stage: Stage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
}

impl From<&CalcError> for ErrorReport {
    fn from(err: &CalcError) -> Self {
        Self {
            code: err.code(),
            stage: err.stage(),
            message: err.to_string(),
            suggestion: err.suggestion(),
        }
    }
}
