//! Per-item mutual exclusion for guarded appends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use stockbook_core::ItemId;

/// Lock table keyed by item id.
///
/// The balance read, policy check and journal append for an item must not
/// interleave with another append touching the same item. Appends on disjoint
/// items proceed in parallel.
#[derive(Debug, Default)]
pub struct ItemLocks {
    table: Mutex<HashMap<ItemId, Arc<Mutex<()>>>>,
}

impl ItemLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the locks of every item in `item_ids`.
    ///
    /// Locks are taken in ascending id order, so two callers with overlapping
    /// item sets cannot deadlock. Table entries nobody else holds or waits on are
    /// dropped afterwards, so unknown ids do not accumulate.
    pub fn with_items<T>(&self, item_ids: &[ItemId], f: impl FnOnce() -> T) -> T {
        let mut ids = item_ids.to_vec();
        ids.sort();
        ids.dedup();

        let mutexes: Vec<Arc<Mutex<()>>> = {
            // The guarded values are `()`, so a poisoned lock carries no broken state.
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            ids.iter()
                .map(|id| Arc::clone(table.entry(*id).or_default()))
                .collect()
        };

        let guards: Vec<MutexGuard<'_, ()>> = mutexes
            .iter()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
            .collect();

        let result = f();
        drop(guards);
        drop(mutexes);
        self.release(&ids);
        result
    }

    /// Remove entries whose only remaining reference is the table's own.
    ///
    /// Clones are only handed out under the table lock, so a count of 1 seen
    /// here cannot race with a new holder.
    fn release(&self, ids: &[ItemId]) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            if table.get(id).is_some_and(|m| Arc::strong_count(m) == 1) {
                table.remove(id);
            }
        }
    }

    /// Number of items currently locked or waited on.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
