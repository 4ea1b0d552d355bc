use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockbook_core::{DomainError, ItemId};
use stockbook_inventory::{Item, JournalLine, StockCalculator, StockPolicy, Transaction, TransactionType};

/// Label used in reports for lines whose item is no longer resolvable.
const UNKNOWN_ITEM: &str = "(unknown item)";

/// One line of the date-ranged transaction report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReportRow {
    pub date: NaiveDate,
    pub reference: String,
    pub tx_type: TransactionType,
    pub item_name: String,
    pub quantity: i64,
    pub notes: String,
}

/// Persistence operation error.
///
/// These are **infrastructure errors**. Domain rejections raised while storing
/// (e.g. re-validation of a transaction) are carried in `Rejected`.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("rejected by store: {0}")]
    Rejected(#[from] DomainError),

    /// Transient failure; adapters own any retry/backoff.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage port for items and the transaction journal.
///
/// Implementations must:
/// - persist a transaction atomically (all lines or none)
/// - never modify or remove a committed transaction
/// - return journal lines ordered by transaction date, then insertion order
pub trait PersistenceGateway: Send + Sync {
    fn create_item(&self, item: &Item) -> Result<(), GatewayError>;

    /// Replace an active item's attributes. Updates to inactive items are rejected.
    fn update_item(&self, item: &Item) -> Result<(), GatewayError>;

    /// Soft delete: the item becomes inactive, journal references stay valid.
    fn delete_item(&self, item_id: ItemId) -> Result<(), GatewayError>;

    fn get_item_by_id(&self, item_id: ItemId) -> Result<Option<Item>, GatewayError>;

    /// Active items.
    fn get_all_items(&self) -> Result<Vec<Item>, GatewayError>;

    fn create_transaction(&self, transaction: &Transaction) -> Result<(), GatewayError>;

    fn lines_for_item(&self, item_id: ItemId) -> Result<Vec<JournalLine>, GatewayError>;

    /// Committed transactions dated within `start..=end`.
    fn transactions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, GatewayError>;

    /// On-hand quantity under `policy`.
    ///
    /// Folds the item's journal lines client-side. Adapters with a server-side
    /// aggregate may override this, but must follow the same rule.
    fn get_current_stock(&self, item_id: ItemId, policy: StockPolicy) -> Result<i64, GatewayError> {
        let lines = self.lines_for_item(item_id)?;
        Ok(StockCalculator::new(policy).balance(&lines)?)
    }

    /// One row per transaction line dated within `start..=end`.
    fn get_transaction_report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TransactionReportRow>, GatewayError> {
        let mut names: HashMap<ItemId, String> = HashMap::new();
        let mut rows = Vec::new();

        for tx in self.transactions_between(start, end)? {
            for line in tx.lines() {
                let item_name = match names.get(&line.item_id()) {
                    Some(name) => name.clone(),
                    None => {
                        let name = self
                            .get_item_by_id(line.item_id())?
                            .map(|item| item.name().to_string())
                            .unwrap_or_else(|| UNKNOWN_ITEM.to_string());
                        names.insert(line.item_id(), name.clone());
                        name
                    }
                };

                rows.push(TransactionReportRow {
                    date: tx.tx_date(),
                    reference: tx.reference().to_string(),
                    tx_type: tx.tx_type(),
                    item_name,
                    quantity: line.quantity(),
                    notes: tx.notes().to_string(),
                });
            }
        }

        Ok(rows)
    }
}

impl<G> PersistenceGateway for Arc<G>
where
    G: PersistenceGateway + ?Sized,
{
    fn create_item(&self, item: &Item) -> Result<(), GatewayError> {
        (**self).create_item(item)
    }

    fn update_item(&self, item: &Item) -> Result<(), GatewayError> {
        (**self).update_item(item)
    }

    fn delete_item(&self, item_id: ItemId) -> Result<(), GatewayError> {
        (**self).delete_item(item_id)
    }

    fn get_item_by_id(&self, item_id: ItemId) -> Result<Option<Item>, GatewayError> {
        (**self).get_item_by_id(item_id)
    }

    fn get_all_items(&self) -> Result<Vec<Item>, GatewayError> {
        (**self).get_all_items()
    }

    fn create_transaction(&self, transaction: &Transaction) -> Result<(), GatewayError> {
        (**self).create_transaction(transaction)
    }

    fn lines_for_item(&self, item_id: ItemId) -> Result<Vec<JournalLine>, GatewayError> {
        (**self).lines_for_item(item_id)
    }

    fn transactions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, GatewayError> {
        (**self).transactions_between(start, end)
    }

    fn get_current_stock(&self, item_id: ItemId, policy: StockPolicy) -> Result<i64, GatewayError> {
        (**self).get_current_stock(item_id, policy)
    }

    fn get_transaction_report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TransactionReportRow>, GatewayError> {
        (**self).get_transaction_report(start, end)
    }
}
