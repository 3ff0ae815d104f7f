//! Tokenizer
//!
//! One left-to-right pass over the input. Whitespace separates tokens, each
//! of `+ - * / ^ ( ) ,` is a token of its own, digits and `.` form numbers
//! and letters form identifiers.

use abacus_core::{parse_literal, CalcError, CalcResult};
use abacus_plugin::OperationRegistry;
use std::fmt;

/// Characters that always form a single-character token
pub const SYMBOLS: [char; 8] = ['+', '-', '*', '/', '^', '(', ')', ','];

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Symbol(char),
    Identifier(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(value) => write!(f, "{}", value),
            Token::Symbol(c) => write!(f, "{}", c),
            Token::Identifier(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Pending {
    Number,
    Identifier,
}

/// Whether a token in this position starts an operand, so a `-` here is a
/// sign rather than a subtraction.
pub(crate) fn is_prefix_position(previous: Option<&Token>, registry: &OperationRegistry) -> bool {
    match previous {
        None => true,
        Some(Token::Symbol('(')) | Some(Token::Symbol(',')) => true,
        Some(Token::Symbol(')')) | Some(Token::Number(_)) => false,
        Some(Token::Symbol(c)) => registry
            .lookup(&c.to_string())
            .map_or(false, |op| op.is_operator()),
        Some(Token::Identifier(name)) => registry.lookup(name).map_or(false, |op| op.is_operator()),
    }
}

struct Tokenizer<'r> {
    registry: &'r OperationRegistry,
    tokens: Vec<Token>,
    buffer: String,
    pending: Option<Pending>,
}

impl<'r> Tokenizer<'r> {
    fn flush(&mut self) -> CalcResult<()> {
        match self.pending.take() {
            Some(Pending::Number) => {
                let value = parse_literal(&self.buffer)?;
                self.tokens.push(Token::Number(value));
            }
            Some(Pending::Identifier) => {
                self.tokens.push(Token::Identifier(self.buffer.clone()));
            }
            None => {}
        }
        self.buffer.clear();
        Ok(())
    }

    fn push_char(&mut self, kind: Pending, c: char) -> CalcResult<()> {
        if self.pending.map_or(false, |current| current != kind) {
            self.flush()?;
        }
        self.pending = Some(kind);
        self.buffer.push(c);
        Ok(())
    }
}

/// Split `input` into tokens.
///
/// A `-` directly followed by a digit or `.` becomes part of a negative
/// literal when it stands where an operand is expected: at the start, after
/// `(` or `,`, or after an operator per `registry`.
pub fn tokenize(input: &str, registry: &OperationRegistry) -> CalcResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut state = Tokenizer {
        registry,
        tokens: Vec::new(),
        buffer: String::new(),
        pending: None,
    };

    for (position, &c) in chars.iter().enumerate() {
        if c.is_whitespace() {
            state.flush()?;
            continue;
        }

        if c == '-' {
            state.flush()?;
            let next_is_numeric = chars
                .get(position + 1)
                .map_or(false, |n| n.is_ascii_digit() || *n == '.');
            if next_is_numeric && is_prefix_position(state.tokens.last(), state.registry) {
                state.pending = Some(Pending::Number);
                state.buffer.push('-');
            } else {
                state.tokens.push(Token::Symbol('-'));
            }
            continue;
        }

        if SYMBOLS.contains(&c) {
            state.flush()?;
            state.tokens.push(Token::Symbol(c));
        } else if c.is_ascii_digit() || c == '.' {
            state.push_char(Pending::Number, c)?;
        } else if c.is_alphabetic() {
            state.push_char(Pending::Identifier, c)?;
        } else {
            return Err(CalcError::InvalidCharacter { ch: c, position });
        }
    }

    state.flush()?;
    Ok(state.tokens)
}
