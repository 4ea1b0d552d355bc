use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;

use stockbook_core::{DomainError, ItemId};
use stockbook_inventory::{Item, Journal, JournalLine, Transaction};

use super::r#trait::{GatewayError, PersistenceGateway};

/// In-memory persistence gateway.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    items: RwLock<HashMap<ItemId, Item>>,
    journal: RwLock<Journal>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed transactions.
    pub fn transaction_count(&self) -> Result<usize, GatewayError> {
        Ok(self.journal()?.len())
    }

    fn items(&self) -> Result<RwLockReadGuard<'_, HashMap<ItemId, Item>>, GatewayError> {
        self.items
            .read()
            .map_err(|_| GatewayError::Unavailable("item store lock poisoned".to_string()))
    }

    fn items_mut(&self) -> Result<RwLockWriteGuard<'_, HashMap<ItemId, Item>>, GatewayError> {
        self.items
            .write()
            .map_err(|_| GatewayError::Unavailable("item store lock poisoned".to_string()))
    }

    fn journal(&self) -> Result<RwLockReadGuard<'_, Journal>, GatewayError> {
        self.journal
            .read()
            .map_err(|_| GatewayError::Unavailable("journal lock poisoned".to_string()))
    }

    fn journal_mut(&self) -> Result<RwLockWriteGuard<'_, Journal>, GatewayError> {
        self.journal
            .write()
            .map_err(|_| GatewayError::Unavailable("journal lock poisoned".to_string()))
    }
}

impl PersistenceGateway for InMemoryGateway {
    fn create_item(&self, item: &Item) -> Result<(), GatewayError> {
        let mut items = self.items_mut()?;

        if items.contains_key(&item.id_typed()) {
            return Err(GatewayError::Duplicate(format!(
                "item {} already exists",
                item.id_typed()
            )));
        }
        if items
            .values()
            .any(|other| other.is_active() && other.code() == item.code())
        {
            return Err(GatewayError::Duplicate(format!(
                "item code already exists: {}",
                item.code()
            )));
        }

        items.insert(item.id_typed(), item.clone());
        Ok(())
    }

    fn update_item(&self, item: &Item) -> Result<(), GatewayError> {
        let mut items = self.items_mut()?;
        let stored = items
            .get_mut(&item.id_typed())
            .ok_or_else(|| GatewayError::NotFound(format!("item {}", item.id_typed())))?;

        if !stored.is_active() {
            return Err(DomainError::validation(format!("item {} is inactive", stored.code())).into());
        }
        if stored.code() != item.code() {
            return Err(DomainError::validation("item code cannot be changed").into());
        }

        *stored = item.clone();
        Ok(())
    }

    fn delete_item(&self, item_id: ItemId) -> Result<(), GatewayError> {
        let mut items = self.items_mut()?;
        let stored = items
            .get_mut(&item_id)
            .ok_or_else(|| GatewayError::NotFound(format!("item {item_id}")))?;
        *stored = stored.deactivated();
        Ok(())
    }

    fn get_item_by_id(&self, item_id: ItemId) -> Result<Option<Item>, GatewayError> {
        Ok(self.items()?.get(&item_id).cloned())
    }

    fn get_all_items(&self) -> Result<Vec<Item>, GatewayError> {
        let mut active: Vec<Item> = self
            .items()?
            .values()
            .filter(|item| item.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.code().cmp(b.code()));
        Ok(active)
    }

    fn create_transaction(&self, transaction: &Transaction) -> Result<(), GatewayError> {
        // Journal::record validates every line before inserting anything.
        self.journal_mut()?.record(transaction.clone())?;
        Ok(())
    }

    fn lines_for_item(&self, item_id: ItemId) -> Result<Vec<JournalLine>, GatewayError> {
        Ok(self
            .journal()?
            .lines_for_item(item_id)
            .map(|(tx, line)| JournalLine::from_parts(tx, line))
            .collect())
    }

    fn transactions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, GatewayError> {
        Ok(self
            .journal()?
            .transactions_between(start, end)
            .cloned()
            .collect())
    }
}
