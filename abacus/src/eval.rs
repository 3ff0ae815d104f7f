//! Expression evaluator
//!
//! Walks the tree depth first. Children are evaluated in order, then the
//! node's operation is applied; the first failure aborts the whole walk.
//! Recursion follows tree height, which [`crate::parse`] caps at
//! [`crate::MAX_TREE_HEIGHT`].

use crate::ast::Expr;
use abacus_core::{CalcError, CalcResult};
use abacus_plugin::Operation;

/// Tree-walking evaluator
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, expr: &Expr) -> CalcResult<f64> {
        match expr {
            Expr::Number(value) => Ok(*value),
            Expr::BinaryOp { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                apply(op, &[left, right])
            }
            Expr::UnaryOp { op, operand } => {
                let value = self.evaluate(operand)?;
                apply(op, &[value])
            }
            Expr::Call { op, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<CalcResult<Vec<f64>>>()?;
                apply(op, &values)
            }
        }
    }
}

fn apply(op: &Operation, args: &[f64]) -> CalcResult<f64> {
    op.execute(args)
        .map_err(|cause| CalcError::evaluation(op.name(), cause))
}
