//! The five service operations, composed over the registry.

use stackcalc_core::{CalcState, EvalError, Statement};

use crate::registry::{CalcId, CalcRegistry, RegistryError};

/// Outcome of evaluating a statement against a calc.
///
/// `state` reflects the session after the (possibly partial) evaluation;
/// `err` is the failure that halted it, if any. The error code is reported
/// even when the very first token fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Post-evaluation stack snapshot.
    pub state: CalcState,
    /// First failure encountered, if evaluation halted early.
    pub err: Option<EvalError>,
}

/// Dispatches requests to the registry and the per-session machines.
///
/// Owns the registry; no other component holds a calc beyond the duration
/// of a single dispatched call.
pub struct Dispatcher {
    registry: CalcRegistry,
}

impl Dispatcher {
    /// Create a dispatcher with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: CalcRegistry::new(),
        }
    }

    /// Create a calc and return its id.
    pub async fn create_calc(&self, stack_depth: usize) -> CalcId {
        let calc_id = self.registry.create(stack_depth).await;
        tracing::debug!(%calc_id, stack_depth, "created calc");
        calc_id
    }

    /// Destroy a calc.
    ///
    /// # Errors
    /// Returns `NotFound` if the id is unknown.
    pub async fn destroy_calc(&self, calc_id: &str) -> Result<(), RegistryError> {
        self.registry.destroy(calc_id).await?;
        tracing::debug!(calc_id, "destroyed calc");
        Ok(())
    }

    /// List up to `limit` calc ids.
    pub async fn list_calcs(&self, limit: usize) -> Vec<CalcId> {
        self.registry.list(limit).await
    }

    /// Evaluate a statement against a calc.
    ///
    /// Evaluation halts at the first failing token; the returned state
    /// reflects everything applied up to that point.
    ///
    /// # Errors
    /// Returns `NotFound` if the id is unknown.
    pub async fn evaluate(
        &self,
        calc_id: &str,
        statement: &Statement,
    ) -> Result<Evaluation, RegistryError> {
        let calc = self.registry.lookup(calc_id).await?;
        let mut calc = calc.lock().await;
        let err = calc.eval_statement(statement).err();
        tracing::debug!(calc_id, ?err, "evaluated statement");
        Ok(Evaluation {
            state: calc.state(),
            err,
        })
    }

    /// Snapshot a calc's state.
    ///
    /// # Errors
    /// Returns `NotFound` if the id is unknown.
    pub async fn get_state(&self, calc_id: &str) -> Result<CalcState, RegistryError> {
        let calc = self.registry.lookup(calc_id).await?;
        let state = calc.lock().await.state();
        Ok(state)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
