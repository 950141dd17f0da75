//! Core stack-machine model for the stackcalc service.
//!
//! This crate provides the fundamental building blocks:
//! - `Calc` - Bounded-stack evaluation engine for one session
//! - `Token` / `Statement` - Instruction model and text grammar
//! - `CalcState` - Snapshot of a calc's stack and capacity
//! - `EvalError` - Evaluation failure taxonomy

pub mod machine;
pub mod statement;

pub use machine::{Calc, CalcState, EvalError};
pub use statement::{ParseTokenError, Statement, Token};
