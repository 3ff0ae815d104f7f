//! Abstract Syntax Tree

use abacus_plugin::Operation;
use std::fmt;

/// A parsed expression. Operator nodes hold the operation they apply, so a
/// tree stays evaluable even if the registry changes after parsing.
#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64),
    BinaryOp {
        op: Operation,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: Operation,
        operand: Box<Expr>,
    },
    Call {
        op: Operation,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn binary(op: Operation, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: Operation, operand: Expr) -> Self {
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// The operation applied at this node, if any.
    pub fn operation(&self) -> Option<&Operation> {
        match self {
            Expr::Number(_) => None,
            Expr::BinaryOp { op, .. } | Expr::UnaryOp { op, .. } | Expr::Call { op, .. } => {
                Some(op)
            }
        }
    }
}

/// Fully parenthesized rendering; prefix negation prints as `-`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => write!(f, "{}", value),
            Expr::BinaryOp { op, left, right } => {
                write!(f, "({} {} {})", left, op.name(), right)
            }
            Expr::UnaryOp { op, operand } => {
                if op.name() == abacus_std::UNARY_MINUS {
                    write!(f, "(-{})", operand)
                } else {
                    write!(f, "({} {})", op.name(), operand)
                }
            }
            Expr::Call { op, args } => {
                write!(f, "{}(", op.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
