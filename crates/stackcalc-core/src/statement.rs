//! Statement and token model, plus the line-oriented text grammar.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single calculator instruction.
///
/// Adding a variant forces every evaluator match to be revisited, so new
/// operations cannot be silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Token {
    /// Push a literal value onto the stack.
    Val { val: i64 },
    /// Pop two values, push their sum.
    Add,
    /// Pop two values, push second-pushed minus first-pushed.
    Subtract,
    /// Pop two values, push their product.
    Multiply,
    /// Pop two values, push their floor quotient.
    Divide,
    /// Discard the top of the stack.
    Drop,
}

/// Token parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid token '{0}'")]
pub struct ParseTokenError(pub String);

impl FromStr for Token {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Self::Add),
            "-" => Ok(Self::Subtract),
            "*" => Ok(Self::Multiply),
            "/" => Ok(Self::Divide),
            "." => Ok(Self::Drop),
            _ => s
                .parse::<i64>()
                .map(|val| Self::Val { val })
                .map_err(|_| ParseTokenError(s.to_string())),
        }
    }
}

/// An ordered batch of tokens evaluated against one calc.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Tokens applied left-to-right.
    pub tokens: Vec<Token>,
}

impl Statement {
    /// Create a statement from a token sequence.
    #[must_use]
    pub const fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }
}

impl From<Vec<Token>> for Statement {
    fn from(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }
}

impl FromStr for Statement {
    type Err = ParseTokenError;

    /// Parse a whitespace-separated token sequence, e.g. `"7 2 / ."`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = s
            .split_whitespace()
            .map(Token::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tokens })
    }
}
