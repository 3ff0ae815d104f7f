//! Expression parser
//!
//! Precedence climbing over the token stream. Binary operators are found
//! through the registry, so their binding strength and associativity come
//! from each operation's declared priority, never from a fixed symbol list.
//!
//! Parsing recurses once per parenthesis, prefix operator, call argument and
//! right-associative operand, and evaluation recurses once per tree level.
//! Both are bounded so that hostile input fails with
//! [`CalcError::NestingTooDeep`] instead of exhausting the stack.

use crate::ast::Expr;
use crate::token::Token;
use abacus_core::{CalcError, CalcResult};
use abacus_plugin::{Operation, OperationKind, OperationRegistry};
use abacus_std::UNARY_MINUS;

/// Deepest parser recursion accepted.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Tallest expression tree accepted. Left-associative chains such as a long
/// sum grow the tree without growing parser recursion.
pub const MAX_TREE_HEIGHT: usize = 1024;

/// A parsed subtree and its height.
type Parsed = (Expr, usize);

/// Build the expression tree for `tokens`.
pub fn parse(tokens: &[Token], registry: &OperationRegistry) -> CalcResult<Expr> {
    if tokens.is_empty() {
        return Err(CalcError::EmptyExpression);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        registry,
    };
    let (expr, _) = parser.parse_expression(0)?;

    match parser.peek() {
        None => Ok(expr),
        Some(Token::Symbol(')')) => Err(CalcError::UnbalancedParentheses(format!(
            "')' at token {} has no matching '('",
            parser.pos + 1
        ))),
        Some(token) => Err(CalcError::UnprocessedTokens(token.to_string())),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    registry: &'a OperationRegistry,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Run `parse` one recursion level deeper.
    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> CalcResult<Parsed>,
    ) -> CalcResult<Parsed> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CalcError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Height of a node whose tallest child is `child_height` high.
    fn grow(child_height: usize) -> CalcResult<usize> {
        let height = child_height + 1;
        if height > MAX_TREE_HEIGHT {
            return Err(CalcError::NestingTooDeep(MAX_TREE_HEIGHT));
        }
        Ok(height)
    }

    /// The binary operation the next token denotes, if it denotes one.
    fn peek_binary(&self) -> CalcResult<Option<Operation>> {
        match self.peek() {
            Some(Token::Symbol(c)) if !matches!(c, '(' | ')' | ',') => {
                match self.registry.lookup(&c.to_string()) {
                    Some(op) if op.kind() == OperationKind::Binary => Ok(Some(op.clone())),
                    _ => Err(CalcError::MissingOperator(c.to_string())),
                }
            }
            Some(Token::Identifier(name)) => Ok(self
                .registry
                .lookup(name)
                .filter(|op| op.kind() == OperationKind::Binary)
                .cloned()),
            _ => Ok(None),
        }
    }

    fn parse_expression(&mut self, min_priority: u8) -> CalcResult<Parsed> {
        self.nested(|parser| parser.parse_operators(min_priority))
    }

    /// Operands and every binary operator of priority `min_priority` or higher.
    fn parse_operators(&mut self, min_priority: u8) -> CalcResult<Parsed> {
        let (mut left, mut height) = self.parse_factor()?;

        while let Some(op) = self.peek_binary()? {
            let priority = op.priority();
            if priority < min_priority {
                break;
            }
            self.pos += 1;

            let next_min = if op.is_right_associative() {
                priority
            } else {
                priority.saturating_add(1)
            };
            let (right, right_height) = self.parse_expression(next_min)?;
            height = Self::grow(height.max(right_height))?;
            left = Expr::binary(op, left, right);
        }

        Ok((left, height))
    }

    fn parse_factor(&mut self) -> CalcResult<Parsed> {
        match self.next() {
            None => Err(CalcError::UnexpectedEnd),
            Some(Token::Number(value)) => Ok((Expr::Number(*value), 1)),
            Some(Token::Symbol('(')) => {
                let inner = self.parse_expression(0)?;
                match self.next() {
                    Some(Token::Symbol(')')) => Ok(inner),
                    None => Err(CalcError::UnbalancedParentheses(
                        "missing ')' before end of expression".to_string(),
                    )),
                    Some(token) => Err(CalcError::UnprocessedTokens(token.to_string())),
                }
            }
            Some(Token::Symbol('-')) => {
                let op = self
                    .registry
                    .lookup(UNARY_MINUS)
                    .cloned()
                    .ok_or_else(|| CalcError::MissingOperator(UNARY_MINUS.to_string()))?;
                self.parse_prefix(op)
            }
            Some(Token::Identifier(name)) => {
                let op = self
                    .registry
                    .lookup(name)
                    .cloned()
                    .ok_or_else(|| CalcError::UnknownToken(name.clone()))?;
                match op.kind() {
                    OperationKind::Function => self.parse_call(name, op),
                    OperationKind::Unary => self.parse_prefix(op),
                    OperationKind::Binary => Err(CalcError::UnknownToken(name.clone())),
                }
            }
            Some(Token::Symbol(c)) => Err(CalcError::UnknownToken(c.to_string())),
        }
    }

    /// Operand of a prefix operator that has been consumed.
    fn parse_prefix(&mut self, op: Operation) -> CalcResult<Parsed> {
        let (operand, height) = self.nested(Self::parse_factor)?;
        Ok((Expr::unary(op, operand), Self::grow(height)?))
    }

    /// Arguments of a call whose name has been consumed.
    fn parse_call(&mut self, name: &str, op: Operation) -> CalcResult<Parsed> {
        match self.next() {
            Some(Token::Symbol('(')) => {}
            _ => return Err(CalcError::MissingFunctionParenthesis(name.to_string())),
        }

        let mut args = Vec::new();
        let mut height = 0;
        if let Some(Token::Symbol(')')) = self.peek() {
            self.pos += 1;
        } else {
            loop {
                let (arg, arg_height) = self.parse_expression(0)?;
                height = height.max(arg_height);
                args.push(arg);
                match self.next() {
                    Some(Token::Symbol(',')) => continue,
                    Some(Token::Symbol(')')) => break,
                    _ => return Err(CalcError::UnclosedFunctionCall(name.to_string())),
                }
            }
        }

        let arity = op.arity();
        if !arity.accepts(args.len()) {
            return Err(CalcError::arity(op.name(), arity.to_string(), args.len()));
        }
        Ok((Expr::Call { op, args }, Self::grow(height)?))
    }
}
