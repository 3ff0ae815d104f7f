//! Abacus Standard Library
//!
//! The fixed builtin operation table. Every calculator registers it into its
//! own registry at construction; there is no shared global instance.

pub mod arithmetic;

use abacus_core::CalcResult;
use abacus_plugin::{BuiltinOperation, Operation, OperationKind, OperationRegistry};

/// Registry name of prefix negation
pub const UNARY_MINUS: &str = "unary_minus";

const fn binary(
    name: &'static str,
    priority: u8,
    right_associative: bool,
    apply: abacus_plugin::BuiltinFn,
) -> BuiltinOperation {
    BuiltinOperation {
        name,
        kind: OperationKind::Binary,
        priority,
        arity: 2,
        right_associative,
        apply,
    }
}

static BUILTINS: [BuiltinOperation; 6] = [
    binary("+", 1, false, arithmetic::add),
    binary("-", 1, false, arithmetic::subtract),
    binary("*", 2, false, arithmetic::multiply),
    binary("/", 2, false, arithmetic::divide),
    binary("^", 3, true, arithmetic::power),
    BuiltinOperation {
        name: UNARY_MINUS,
        kind: OperationKind::Unary,
        priority: 4,
        arity: 1,
        right_associative: true,
        apply: arithmetic::negate,
    },
];

/// The builtin table, in registration order.
pub fn builtin_operations() -> &'static [BuiltinOperation] {
    &BUILTINS
}

/// Register every builtin into `registry`
pub fn register_builtins(registry: &mut OperationRegistry) -> CalcResult<()> {
    for op in builtin_operations() {
        registry.register(op.name, Operation::Builtin(*op))?;
    }
    Ok(())
}

/// Create registry with the builtins
pub fn standard_registry() -> CalcResult<OperationRegistry> {
    let mut registry = OperationRegistry::new();
    register_builtins(&mut registry)?;
    Ok(registry)
}
