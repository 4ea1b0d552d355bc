//! Append-only transaction journal.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, DomainResult, ItemId, TransactionId};

use crate::policy::validate_lines;
use crate::transaction::{DraftTransaction, Transaction, TransactionLine, TransactionType};

/// Journal position: transaction date, then insertion order.
type Position = (NaiveDate, u64);

/// A journal line detached from its transaction, carrying just the header
/// fields needed to interpret it. Used where borrowing the journal is not
/// possible (e.g. across a storage lock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    pub transaction_id: TransactionId,
    pub tx_type: TransactionType,
    pub tx_date: NaiveDate,
    pub line: TransactionLine,
}

impl JournalLine {
    pub fn from_parts(transaction: &Transaction, line: &TransactionLine) -> Self {
        Self {
            transaction_id: transaction.id_typed(),
            tx_type: transaction.tx_type(),
            tx_date: transaction.tx_date(),
            line: line.clone(),
        }
    }
}

/// In-memory journal of committed transactions.
///
/// Transactions are never mutated or removed once recorded. Iteration order is
/// transaction date, then the order in which transactions were appended.
///
/// A per-item index of (position, line index) keeps [`Journal::lines_for_item`]
/// proportional to that item's own history.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: BTreeMap<Position, Transaction>,
    positions: HashMap<TransactionId, Position>,
    by_item: HashMap<ItemId, BTreeSet<(Position, usize)>>,
    next_seq: u64,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a draft and record it.
    pub fn append(&mut self, draft: DraftTransaction) -> DomainResult<TransactionId> {
        let transaction = draft.commit()?;
        self.record(transaction)
    }

    /// Record an already committed transaction.
    ///
    /// Lines are re-validated, since a `Transaction` may also come from storage.
    pub fn record(&mut self, transaction: Transaction) -> DomainResult<TransactionId> {
        let id = transaction.id_typed();
        if self.positions.contains_key(&id) {
            return Err(DomainError::validation(format!(
                "transaction {id} is already committed"
            )));
        }
        validate_lines(transaction.tx_type(), transaction.lines())?;

        let position = (transaction.tx_date(), self.next_seq);
        self.next_seq += 1;
        for (index, line) in transaction.lines().iter().enumerate() {
            self.by_item
                .entry(line.item_id())
                .or_default()
                .insert((position, index));
        }
        self.positions.insert(id, position);
        self.entries.insert(position, transaction);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.positions.get(&id).and_then(|p| self.entries.get(p))
    }

    pub fn contains(&self, id: TransactionId) -> bool {
        self.positions.contains_key(&id)
    }

    /// All transactions in journal order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> + '_ {
        self.entries.values()
    }

    /// Every line that references `item_id`, paired with its transaction.
    pub fn lines_for_item(
        &self,
        item_id: ItemId,
    ) -> impl Iterator<Item = (&Transaction, &TransactionLine)> + '_ {
        self.by_item
            .get(&item_id)
            .into_iter()
            .flatten()
            .filter_map(move |(position, index)| {
                let tx = self.entries.get(position)?;
                tx.lines().get(*index).map(|line| (tx, line))
            })
    }

    /// Transactions dated within `start..=end`. Empty when `start > end`.
    pub fn transactions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Iterator<Item = &Transaction> + '_ {
        (start <= end)
            .then(|| self.entries.range((start, 0)..=(end, u64::MAX)))
            .into_iter()
            .flatten()
            .map(|(_, tx)| tx)
    }
}
