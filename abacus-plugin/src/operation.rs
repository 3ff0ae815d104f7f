//! Operations the parser can reference
//!
//! An operation is either a builtin (a plain function from a fixed table) or
//! backed by a loaded extension module. Both expose the same capabilities.

use crate::extension::{ExtensionModule, OperationCategory};
use abacus_core::{CalcError, CalcResult};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// How an operation appears in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Infix, two operands: `a + b`, `a mod b`
    Binary,
    /// Prefix, one operand: `-a`
    Unary,
    /// Call syntax: `sin(x)`, `max(a, b, c)`
    Function,
}

/// Accepted argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Arity {
    pub min: usize,
    /// `None` means no upper bound.
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exact(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    pub const fn at_least(n: usize) -> Self {
        Self { min: n, max: None }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self { min, max: Some(max) }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", max),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

pub type BuiltinFn = fn(&[f64]) -> CalcResult<f64>;

/// An entry of the builtin operation table
#[derive(Clone, Copy)]
pub struct BuiltinOperation {
    pub name: &'static str,
    pub kind: OperationKind,
    /// 0 binds loosest
    pub priority: u8,
    pub arity: usize,
    pub right_associative: bool,
    pub apply: BuiltinFn,
}

impl fmt::Debug for BuiltinOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinOperation")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("arity", &self.arity)
            .field("right_associative", &self.right_associative)
            .finish()
    }
}

/// A registered operation
///
/// Extension-backed operations share ownership of their module, so a parsed
/// expression keeps the module alive for as long as it holds the operation.
#[derive(Debug, Clone)]
pub enum Operation {
    Builtin(BuiltinOperation),
    Extension(Arc<ExtensionModule>),
}

impl Operation {
    pub fn name(&self) -> &str {
        match self {
            Operation::Builtin(op) => op.name,
            Operation::Extension(module) => module.standardized_name(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Builtin(op) => op.kind,
            Operation::Extension(module) => match module.category() {
                OperationCategory::TwoOperand => OperationKind::Binary,
                OperationCategory::SingleOperand => OperationKind::Unary,
                OperationCategory::MathFunction => OperationKind::Function,
            },
        }
    }

    pub fn priority(&self) -> u8 {
        match self {
            Operation::Builtin(op) => op.priority,
            Operation::Extension(module) => module.priority(),
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Operation::Builtin(op) => Arity::exact(op.arity),
            Operation::Extension(module) => module.parameter_range(),
        }
    }

    pub fn is_right_associative(&self) -> bool {
        match self {
            Operation::Builtin(op) => op.right_associative,
            Operation::Extension(module) => module.is_right_associative(),
        }
    }

    /// Binary and unary operations count as operators for unary-minus
    /// disambiguation; functions do not.
    pub fn is_operator(&self) -> bool {
        matches!(self.kind(), OperationKind::Binary | OperationKind::Unary)
    }

    pub fn execute(&self, args: &[f64]) -> CalcResult<f64> {
        match self {
            Operation::Builtin(op) => {
                if args.len() != op.arity {
                    return Err(CalcError::arity(op.name, op.arity.to_string(), args.len()));
                }
                (op.apply)(args)
            }
            Operation::Extension(module) => module.compute(args).map_err(CalcError::from),
        }
    }

    /// Whether both handles refer to the same operation instance.
    pub fn same_as(&self, other: &Operation) -> bool {
        match (self, other) {
            (Operation::Builtin(a), Operation::Builtin(b)) => {
                a.name == b.name && a.kind == b.kind
            }
            (Operation::Extension(a), Operation::Extension(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
