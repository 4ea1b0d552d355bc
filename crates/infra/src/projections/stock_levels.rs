use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use stockbook_core::{ItemId, TransactionId};
use stockbook_inventory::{Item, StockCalculator, StockPolicy, Transaction};

use crate::read_model::ReadModelStore;

/// Queryable read model: cached on-hand quantity per active item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub item_id: ItemId,
    pub item_code: String,
    pub name: String,
    pub min_stock: u32,
    pub quantity: i64,
}

impl StockLevel {
    /// At or over the reorder threshold is fine; strictly under is not.
    pub fn is_below_minimum(&self) -> bool {
        self.quantity < i64::from(self.min_stock)
    }
}

/// Stock level projection.
///
/// Each committed transaction is folded in once, under the policy in force when
/// it is applied. Cached quantities therefore do not follow later policy
/// changes; [`StockLevelProjection::rebuild_with`] recomputes them.
///
/// Every write (item refresh, transaction fold, rebuild) runs under the
/// `applied` lock, so read-modify-write of a cached quantity never interleaves.
#[derive(Debug)]
pub struct StockLevelProjection<S>
where
    S: ReadModelStore<ItemId, StockLevel>,
{
    store: S,
    applied: Mutex<HashSet<TransactionId>>,
}

impl<S> StockLevelProjection<S>
where
    S: ReadModelStore<ItemId, StockLevel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            applied: Mutex::new(HashSet::new()),
        }
    }

    pub fn get(&self, item_id: &ItemId) -> Option<StockLevel> {
        self.store.get(item_id)
    }

    /// All tracked items, ordered by item code.
    pub fn list(&self) -> Vec<StockLevel> {
        let mut levels = self.store.list();
        levels.sort_by(|a, b| a.item_code.cmp(&b.item_code));
        levels
    }

    /// Items whose cached quantity is under their minimum stock.
    pub fn below_minimum(&self) -> Vec<StockLevel> {
        self.list()
            .into_iter()
            .filter(StockLevel::is_below_minimum)
            .collect()
    }

    /// Track a new item or refresh the descriptive fields of a known one.
    ///
    /// Inactive items are dropped from the read model.
    pub fn apply_item(&self, item: &Item) {
        let _applied = self.lock_applied();
        self.refresh_item(item);
    }

    pub fn forget_item(&self, item_id: &ItemId) {
        let _applied = self.lock_applied();
        self.store.remove(item_id);
    }

    /// Fold a committed transaction into the cached quantities.
    ///
    /// - Idempotent: a transaction id seen before is ignored (returns `false`)
    /// - Lines for items not tracked by the read model are skipped
    pub fn apply_transaction(&self, transaction: &Transaction, policy: StockPolicy) -> bool {
        let mut applied = self.lock_applied();
        self.fold_transaction(&mut applied, transaction, policy)
    }

    /// Rebuild the read model by replaying the given items and transactions.
    pub fn rebuild_from_scratch<'a>(
        &self,
        items: impl IntoIterator<Item = &'a Item>,
        transactions: impl IntoIterator<Item = &'a Transaction>,
        policy: StockPolicy,
    ) {
        let mut applied = self.lock_applied();
        self.replay(&mut applied, items, transactions, policy);
    }

    /// Rebuild from a snapshot produced by `load` while the projection is locked.
    ///
    /// A transaction committed before `load` runs is part of the snapshot; one
    /// committed after it waits for the rebuild and is then folded in by its own
    /// `apply_transaction`. Returns the number of items and transactions replayed.
    pub fn rebuild_with<E>(
        &self,
        policy: StockPolicy,
        load: impl FnOnce() -> Result<(Vec<Item>, Vec<Transaction>), E>,
    ) -> Result<(usize, usize), E> {
        let mut applied = self.lock_applied();
        let (items, transactions) = load()?;
        self.replay(&mut applied, &items, &transactions, policy);
        Ok((items.len(), transactions.len()))
    }

    fn lock_applied(&self) -> MutexGuard<'_, HashSet<TransactionId>> {
        self.applied.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replay<'a>(
        &self,
        applied: &mut HashSet<TransactionId>,
        items: impl IntoIterator<Item = &'a Item>,
        transactions: impl IntoIterator<Item = &'a Transaction>,
        policy: StockPolicy,
    ) {
        applied.clear();
        self.store.clear();

        for item in items {
            self.refresh_item(item);
        }
        for transaction in transactions {
            self.fold_transaction(applied, transaction, policy);
        }
    }

    fn refresh_item(&self, item: &Item) {
        let item_id = item.id_typed();
        if !item.is_active() {
            self.store.remove(&item_id);
            return;
        }

        let quantity = self.store.get(&item_id).map(|level| level.quantity).unwrap_or(0);
        self.store.upsert(
            item_id,
            StockLevel {
                item_id,
                item_code: item.code().to_string(),
                name: item.name().to_string(),
                min_stock: item.min_stock(),
                quantity,
            },
        );
    }

    fn fold_transaction(
        &self,
        applied: &mut HashSet<TransactionId>,
        transaction: &Transaction,
        policy: StockPolicy,
    ) -> bool {
        if !applied.insert(transaction.id_typed()) {
            return false;
        }

        let calculator = StockCalculator::new(policy);
        for line in transaction.lines() {
            let Some(mut level) = self.store.get(&line.item_id()) else {
                tracing::debug!(
                    transaction_id = %transaction.id_typed(),
                    item_id = %line.item_id(),
                    "skipping line for untracked item"
                );
                continue;
            };
            // The journal fold reports overflow; the cache just pins at the bound.
            level.quantity = level
                .quantity
                .saturating_add(calculator.contribution_of(&(transaction, line)));
            self.store.upsert(line.item_id(), level);
        }

        true
    }
}
