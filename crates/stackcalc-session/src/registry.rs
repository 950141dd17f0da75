//! Registry owning every live calculator session.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use stackcalc_core::Calc;
use tokio::sync::{Mutex, RwLock};

/// Calc identifier: the registry counter rendered as lowercase hex.
pub type CalcId = String;

/// Registry error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Calc not found for ID '{0}'")]
    NotFound(CalcId),
}

/// Owns the mapping from calc id to live session.
///
/// The mapping is guarded by an async `RwLock` so lookups never observe a
/// half-updated map; each calc sits behind its own `Mutex` so evaluation
/// is serialized per session while distinct sessions proceed in parallel.
/// A destroy racing an in-flight evaluate leaves the evaluate holding the
/// last `Arc` to the detached calc; the stale evaluation completes against
/// it and the result is discarded with the calc.
pub struct CalcRegistry {
    calcs: RwLock<HashMap<CalcId, Arc<Mutex<Calc>>>>,
    next_id: AtomicU64,
}

impl CalcRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calcs: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Create a calc with an empty stack and the given capacity.
    ///
    /// Never fails; the number of sessions is unbounded.
    pub async fn create(&self, stack_depth: usize) -> CalcId {
        let id = format!("{:x}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let calc = Arc::new(Mutex::new(Calc::new(stack_depth)));
        self.calcs.write().await.insert(id.clone(), calc);
        id
    }

    /// Remove a calc.
    ///
    /// # Errors
    /// Returns `NotFound` if the id is unknown.
    pub async fn destroy(&self, id: &str) -> Result<(), RegistryError> {
        self.calcs
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// List up to `limit` calc ids, in map order.
    pub async fn list(&self, limit: usize) -> Vec<CalcId> {
        self.calcs
            .read()
            .await
            .keys()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Look up a calc handle.
    ///
    /// # Errors
    /// Returns `NotFound` if the id is unknown.
    pub async fn lookup(&self, id: &str) -> Result<Arc<Mutex<Calc>>, RegistryError> {
        self.calcs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }
}

impl Default for CalcRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[tokio::test]
    async fn test_create_mints_sequential_hex_ids() {
        let registry = CalcRegistry::new();
        assert_eq!(registry.create(3).await, "0");
        assert_eq!(registry.create(3).await, "1");
        for _ in 0..14 {
            registry.create(3).await;
        }
        assert_eq!(registry.create(3).await, "10");
    }

    #[tokio::test]
    async fn test_lookup_after_create() {
        let registry = CalcRegistry::new();
        let id = registry.create(5).await;
        let calc = registry.lookup(&id).await.unwrap();
        let calc = calc.lock().await;
        assert_eq!(calc.stack_depth(), 5);
        assert!(calc.stack().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_unknown_id() {
        let registry = CalcRegistry::new();
        assert_eq!(
            registry.destroy("feed").await,
            Err(RegistryError::NotFound("feed".to_string()))
        );
    }

    #[tokio::test]
    async fn test_destroyed_id_no_longer_resolves() {
        let registry = CalcRegistry::new();
        let id = registry.create(3).await;
        registry.destroy(&id).await.unwrap();
        assert!(registry.lookup(&id).await.is_err());
        assert!(registry.destroy(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_list_respects_limit() {
        let registry = CalcRegistry::new();
        for _ in 0..5 {
            registry.create(3).await;
        }
        assert!(registry.list(0).await.is_empty());
        assert_eq!(registry.list(2).await.len(), 2);
        assert_eq!(registry.list(100).await.len(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_creates_mint_unique_ids() {
        let registry = Arc::new(CalcRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move { registry.create(3).await }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        assert_eq!(ids.len(), 50);
    }

    #[tokio::test]
    async fn test_destroy_with_evaluation_in_flight_is_safe() {
        let registry = CalcRegistry::new();
        let id = registry.create(3).await;

        let handle = registry.lookup(&id).await.unwrap();
        let mut calc = handle.lock().await;
        registry.destroy(&id).await.unwrap();

        // The detached calc is still usable by the holder of the handle.
        calc.push(1).unwrap();
        assert_eq!(calc.stack(), &[1]);
        assert!(registry.lookup(&id).await.is_err());
    }
}
