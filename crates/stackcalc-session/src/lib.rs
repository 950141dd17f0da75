//! Session lifecycle and request dispatch for stackcalc.
//!
//! Provides:
//! - `CalcRegistry` - Concurrency-safe calc lifecycle and lookup
//! - `Dispatcher` - The five service operations over the registry

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{Dispatcher, Evaluation};
pub use registry::{CalcId, CalcRegistry, RegistryError};
