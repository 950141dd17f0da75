//! Bounded-stack evaluation engine for one calculator session.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::statement::{Statement, Token};

/// Evaluation failure.
///
/// These are data-level outcomes carried inside normal responses, never
/// transport faults. Divide-by-zero reports `StackUnderflow`; the divide
/// operation restores both operands before failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalError {
    /// A push would exceed the stack capacity.
    #[error("stack overflow")]
    StackOverflow,
    /// An operation found fewer operands than it requires.
    #[error("stack underflow")]
    StackUnderflow,
}

/// Snapshot of a calc's stack contents and capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalcState {
    /// Maximum number of values the stack may hold.
    pub stack_depth: usize,
    /// Stack contents, bottom first.
    pub vals: Vec<i64>,
}

/// One calculator session: a bounded stack of signed integers.
///
/// The capacity is fixed at creation. Every operation either succeeds or
/// fails with an [`EvalError`] and leaves the stack unchanged relative to
/// that operation's attempt.
#[derive(Debug, Clone)]
pub struct Calc {
    stack: Vec<i64>,
    stack_depth: usize,
}

impl Calc {
    /// Create an empty calc with the given capacity.
    #[must_use]
    pub fn new(stack_depth: usize) -> Self {
        Self {
            stack: Vec::with_capacity(stack_depth),
            stack_depth,
        }
    }

    /// Stack capacity.
    #[must_use]
    pub const fn stack_depth(&self) -> usize {
        self.stack_depth
    }

    /// Current stack contents, bottom first.
    #[must_use]
    pub fn stack(&self) -> &[i64] {
        &self.stack
    }

    /// Snapshot the stack and capacity.
    #[must_use]
    pub fn state(&self) -> CalcState {
        CalcState {
            stack_depth: self.stack_depth,
            vals: self.stack.clone(),
        }
    }

    /// Push a value.
    ///
    /// # Errors
    /// Returns `StackOverflow` if the stack is at capacity.
    pub fn push(&mut self, val: i64) -> Result<(), EvalError> {
        if self.stack.len() >= self.stack_depth {
            return Err(EvalError::StackOverflow);
        }
        self.stack.push(val);
        Ok(())
    }

    /// Pop the two operands for a binary operation: `a` is the most
    /// recently pushed, `b` the next.
    fn pop_operands(&mut self) -> Result<(i64, i64), EvalError> {
        if self.stack.len() < 2 {
            return Err(EvalError::StackUnderflow);
        }
        let a = self.stack.pop().ok_or(EvalError::StackUnderflow)?;
        let b = self.stack.pop().ok_or(EvalError::StackUnderflow)?;
        Ok((a, b))
    }

    /// Pop two values, push their sum.
    ///
    /// # Errors
    /// Returns `StackUnderflow` with fewer than two operands.
    pub fn add(&mut self) -> Result<(), EvalError> {
        let (a, b) = self.pop_operands()?;
        self.stack.push(a.wrapping_add(b));
        Ok(())
    }

    /// Pop two values, push `b - a` (the earlier-pushed minus the top).
    ///
    /// # Errors
    /// Returns `StackUnderflow` with fewer than two operands.
    pub fn subtract(&mut self) -> Result<(), EvalError> {
        let (a, b) = self.pop_operands()?;
        self.stack.push(b.wrapping_sub(a));
        Ok(())
    }

    /// Pop two values, push their product.
    ///
    /// # Errors
    /// Returns `StackUnderflow` with fewer than two operands.
    pub fn multiply(&mut self) -> Result<(), EvalError> {
        let (a, b) = self.pop_operands()?;
        self.stack.push(a.wrapping_mul(b));
        Ok(())
    }

    /// Pop two values, push `b / a` rounded toward negative infinity.
    ///
    /// A zero divisor restores both operands in their original order and
    /// fails; the stack is unchanged.
    ///
    /// # Errors
    /// Returns `StackUnderflow` with fewer than two operands or when the
    /// divisor is zero.
    pub fn divide(&mut self) -> Result<(), EvalError> {
        let (a, b) = self.pop_operands()?;
        if a == 0 {
            self.stack.push(b);
            self.stack.push(a);
            return Err(EvalError::StackUnderflow);
        }
        self.stack.push(div_floor(b, a));
        Ok(())
    }

    /// Discard the top of the stack.
    ///
    /// # Errors
    /// Returns `StackUnderflow` on an empty stack.
    pub fn drop_top(&mut self) -> Result<(), EvalError> {
        self.stack.pop().map(|_| ()).ok_or(EvalError::StackUnderflow)
    }

    /// Apply a single token.
    ///
    /// # Errors
    /// Propagates the failure of the corresponding operation.
    pub fn apply(&mut self, token: Token) -> Result<(), EvalError> {
        match token {
            Token::Val { val } => self.push(val),
            Token::Add => self.add(),
            Token::Subtract => self.subtract(),
            Token::Multiply => self.multiply(),
            Token::Divide => self.divide(),
            Token::Drop => self.drop_top(),
        }
    }

    /// Apply a statement's tokens in order, halting at the first failure.
    ///
    /// On failure the stack reflects every token applied before the
    /// halting one, including any restoration done by the failing
    /// operation itself.
    ///
    /// # Errors
    /// Returns the first token's failure.
    pub fn eval_statement(&mut self, statement: &Statement) -> Result<(), EvalError> {
        for token in &statement.tokens {
            self.apply(*token)?;
        }
        Ok(())
    }
}

/// Flooring division. Rust's `/` truncates toward zero; the calculator
/// rounds toward negative infinity.
fn div_floor(b: i64, a: i64) -> i64 {
    let q = b.wrapping_div(a);
    let r = b.wrapping_rem(a);
    if r != 0 && (r < 0) != (a < 0) { q - 1 } else { q }
}
