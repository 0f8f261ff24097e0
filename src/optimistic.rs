//! Optimistic local updates that reconcile once the backend call settles.
//!
//! The displayed value changes before the write happens. If the write fails
//! the slot goes back to the last value the backend is known to hold.

use crate::error::Result;

/// Shows `next` in `slot`, then persists it. On failure `slot` is restored.
/// Returns the prior value on success.
pub fn apply<V, F>(slot: &mut V, next: V, persist: F) -> Result<V>
where
    V: Clone,
    F: FnOnce(&V) -> Result<()>,
{
    let prior = std::mem::replace(slot, next);
    match persist(slot) {
        Ok(()) => Ok(prior),
        Err(err) => {
            *slot = prior;
            Err(err)
        }
    }
}

/// A change already visible locally whose write is deferred (e.g. waiting on approval).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending<V> {
    pub id: i64,
    pub prior: V,
    pub next: V,
}

impl<V: Clone> Pending<V> {
    /// Shows `next` in `slot` without persisting anything.
    pub fn begin(id: i64, slot: &mut V, next: V) -> Self {
        let prior = std::mem::replace(slot, next.clone());
        Self { id, prior, next }
    }

    /// Drops the change and shows the prior value again.
    pub fn revert(&self, slot: &mut V) {
        *slot = self.prior.clone();
    }

    /// Persists the deferred value; the slot is restored if that fails.
    pub fn commit<F>(&self, slot: &mut V, persist: F) -> Result<()>
    where
        F: FnOnce(&V) -> Result<()>,
    {
        *slot = self.next.clone();
        persist(&self.next).inspect_err(|_| self.revert(slot))
    }
}
