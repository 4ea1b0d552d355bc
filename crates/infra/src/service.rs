//! Inventory application service.
//!
//! Composes the Persistence Gateway, the Settings Provider, the per-item lock
//! table and the stock level projection behind the operations the presentation
//! layer calls. Guarded appends run this pipeline:
//!
//! ```text
//! DraftTransaction
//!   ↓
//! 1. Lock every referenced item (ascending id order)
//!   ↓
//! 2. Resolve items (NotFound / inactive) and read their balances from the journal
//!   ↓
//! 3. Policy engine: structural guards + stock sufficiency
//!   ↓
//! 4. Commit the draft and append it through the gateway (atomic)
//!   ↓
//! 5. Release locks, fold the transaction into the projection
//! ```
//!
//! This module contains no IO itself; it composes the injected ports.

use chrono::NaiveDate;
use thiserror::Error;

use stockbook_core::{DomainError, ItemId, TransactionId};
use stockbook_inventory::{
    DraftTransaction, Item, ItemChanges, NewItem, PolicyEngine, StockPolicy, Transaction,
};

use crate::gateway::{GatewayError, PersistenceGateway, TransactionReportRow};
use crate::locks::ItemLocks;
use crate::projections::stock_levels::{StockLevel, StockLevelProjection};
use crate::read_model::InMemoryReadModelStore;
use crate::settings::SettingsProvider;

/// Service-level failure.
///
/// Domain rejections (including those a gateway raised while storing) surface
/// as `Domain` so callers always see which guard failed.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("persistence failed: {0}")]
    Gateway(GatewayError),
}

impl ServiceError {
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            ServiceError::Gateway(_) => None,
        }
    }
}

impl From<GatewayError> for ServiceError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::NotFound(_) => ServiceError::Domain(DomainError::NotFound),
            GatewayError::Rejected(e) => ServiceError::Domain(e),
            GatewayError::Duplicate(msg) => ServiceError::Domain(DomainError::Validation(msg)),
            other => ServiceError::Gateway(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

type StockLevels = StockLevelProjection<InMemoryReadModelStore<ItemId, StockLevel>>;

/// Entry point for item maintenance, stock movements and stock queries.
#[derive(Debug)]
pub struct InventoryService<G, P> {
    gateway: G,
    settings: P,
    locks: ItemLocks,
    levels: StockLevels,
}

impl<G, P> InventoryService<G, P> {
    pub fn new(gateway: G, settings: P) -> Self {
        Self {
            gateway,
            settings,
            locks: ItemLocks::new(),
            levels: StockLevelProjection::new(InMemoryReadModelStore::new()),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn settings(&self) -> &P {
        &self.settings
    }
}

impl<G, P> InventoryService<G, P>
where
    G: PersistenceGateway,
    P: SettingsProvider,
{
    /// Register a new item. The code must not collide with an active item.
    pub fn create_item(&self, new: NewItem) -> ServiceResult<Item> {
        let item = Item::create(new)?;

        if self
            .gateway
            .get_all_items()?
            .iter()
            .any(|existing| existing.code() == item.code())
        {
            return Err(DomainError::validation(format!(
                "item code already exists: {}",
                item.code()
            ))
            .into());
        }

        self.gateway.create_item(&item)?;
        self.levels.apply_item(&item);

        tracing::info!(
            item_id = %item.id_typed(),
            code = item.code(),
            palindrome = item.is_palindrome(),
            "item created"
        );
        Ok(item)
    }

    /// Replace an item's editable attributes. Inactive items cannot be edited.
    pub fn update_item(&self, item_id: ItemId, changes: ItemChanges) -> ServiceResult<Item> {
        let updated = self.locks.with_items(&[item_id], || -> ServiceResult<Item> {
            let current = self.get_item(item_id)?;
            if !current.is_active() {
                return Err(DomainError::validation(format!("item {} is inactive", current.code())).into());
            }
            let updated = current.update(changes)?;
            self.gateway.update_item(&updated)?;
            self.levels.apply_item(&updated);
            Ok(updated)
        })?;

        tracing::info!(item_id = %item_id, code = updated.code(), "item updated");
        Ok(updated)
    }

    /// Soft-delete an item. Its journal history is kept.
    pub fn delete_item(&self, item_id: ItemId) -> ServiceResult<()> {
        self.locks.with_items(&[item_id], || -> ServiceResult<()> {
            self.gateway.delete_item(item_id)?;
            self.levels.forget_item(&item_id);
            Ok(())
        })?;

        tracing::info!(item_id = %item_id, "item deleted");
        Ok(())
    }

    pub fn get_item(&self, item_id: ItemId) -> ServiceResult<Item> {
        self.gateway
            .get_item_by_id(item_id)?
            .ok_or_else(|| DomainError::not_found().into())
    }

    pub fn list_items(&self) -> ServiceResult<Vec<Item>> {
        Ok(self.gateway.get_all_items()?)
    }

    /// Active items whose code, name or category contains `query` (case-insensitive).
    pub fn search_items(&self, query: &str) -> ServiceResult<Vec<Item>> {
        Ok(self
            .gateway
            .get_all_items()?
            .into_iter()
            .filter(|item| item.matches(query))
            .collect())
    }

    /// Validate and commit a transaction.
    ///
    /// The policy is read once from the settings provider and used for both the
    /// guard and the projection update.
    pub fn append_transaction(&self, draft: DraftTransaction) -> ServiceResult<TransactionId> {
        let policy = self.settings.policy();
        let draft_id = draft.id();
        let tx_type = draft.tx_type();
        let item_ids = draft.item_ids();

        let committed = self
            .locks
            .with_items(&item_ids, || self.guarded_append(draft, policy));

        let transaction = match committed {
            Ok(transaction) => transaction,
            Err(err) => {
                tracing::warn!(
                    transaction_id = %draft_id,
                    tx_type = %tx_type,
                    error = %err,
                    "transaction rejected"
                );
                return Err(err);
            }
        };

        self.levels.apply_transaction(&transaction, policy);

        tracing::info!(
            transaction_id = %transaction.id_typed(),
            tx_type = %transaction.tx_type(),
            lines = transaction.lines().len(),
            "transaction committed"
        );
        Ok(transaction.id_typed())
    }

    /// On-hand quantity computed from the journal under the current policy.
    pub fn current_stock(&self, item_id: ItemId) -> ServiceResult<i64> {
        self.get_item(item_id)?;
        let policy = self.settings.policy();
        let stock = self.gateway.get_current_stock(item_id, policy)?;

        tracing::debug!(item_id = %item_id, stock, "current stock computed");
        Ok(stock)
    }

    /// Cached quantity from the projection. Not synchronized with appends.
    pub fn cached_stock(&self, item_id: ItemId) -> Option<i64> {
        self.levels.get(&item_id).map(|level| level.quantity)
    }

    pub fn stock_level(&self, item_id: ItemId) -> Option<StockLevel> {
        self.levels.get(&item_id)
    }

    pub fn stock_levels(&self) -> Vec<StockLevel> {
        self.levels.list()
    }

    /// Reorder list: cached quantity under the item's minimum stock.
    pub fn low_stock_items(&self) -> Vec<StockLevel> {
        self.levels.below_minimum()
    }

    /// Recompute every cached level from the journal under the current policy.
    pub fn rebuild_stock_levels(&self) -> ServiceResult<()> {
        let policy = self.settings.policy();
        let (items, transactions) = self.levels.rebuild_with(policy, || -> ServiceResult<_> {
            let items = self.gateway.get_all_items()?;
            let transactions = self.gateway.transactions_between(NaiveDate::MIN, NaiveDate::MAX)?;
            Ok((items, transactions))
        })?;

        tracing::info!(items, transactions, "stock levels rebuilt");
        Ok(())
    }

    /// One row per transaction line dated within `start..=end`.
    pub fn transaction_report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceResult<Vec<TransactionReportRow>> {
        if start > end {
            return Err(DomainError::validation("start date cannot be after end date").into());
        }
        Ok(self.gateway.get_transaction_report(start, end)?)
    }

    /// Steps 2-4 of the append pipeline. Caller holds the item locks.
    fn guarded_append(&self, draft: DraftTransaction, policy: StockPolicy) -> ServiceResult<Transaction> {
        PolicyEngine::new(policy).check(&draft, |item_id| self.balance_for_append(item_id, policy))?;

        let transaction = draft.commit()?;
        self.gateway.create_transaction(&transaction)?;
        Ok(transaction)
    }

    fn balance_for_append(&self, item_id: ItemId, policy: StockPolicy) -> ServiceResult<i64> {
        let item = self.get_item(item_id)?;
        if !item.is_active() {
            return Err(DomainError::validation(format!("item {} is inactive", item.code())).into());
        }
        Ok(self.gateway.get_current_stock(item_id, policy)?)
    }
}
