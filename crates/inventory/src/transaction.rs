use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{DomainResult, Entity, ItemId, LineId, LocationId, TransactionId, UserId};

use crate::policy::validate_lines;

/// Kind of stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Goods received.
    In,
    /// Goods issued.
    Out,
    /// Stock correction; the only type whose quantities are signed.
    Adjust,
    /// Goods written off (scrapped, damaged, expired).
    Disposition,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::In => "IN",
            TransactionType::Out => "OUT",
            TransactionType::Adjust => "ADJUST",
            TransactionType::Disposition => "DISPOSITION",
        }
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical condition of the goods on a line.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionStatus {
    #[default]
    Usable,
    NotUsable,
}

/// Line input for a draft transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLine {
    pub item_id: ItemId,
    pub location_id: Option<LocationId>,
    pub quantity: i64,
    pub condition: ConditionStatus,
    pub unit_price: Option<Decimal>,
}

impl NewLine {
    pub fn new(item_id: ItemId, quantity: i64) -> Self {
        Self {
            item_id,
            location_id: None,
            quantity,
            condition: ConditionStatus::Usable,
            unit_price: None,
        }
    }

    pub fn at_location(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }

    pub fn with_condition(mut self, condition: ConditionStatus) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_unit_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }
}

/// One item movement inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLine {
    id: LineId,
    transaction_id: TransactionId,
    item_id: ItemId,
    location_id: Option<LocationId>,
    quantity: i64,
    condition: ConditionStatus,
    unit_price: Option<Decimal>,
}

impl TransactionLine {
    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn location_id(&self) -> Option<LocationId> {
        self.location_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn condition(&self) -> ConditionStatus {
        self.condition
    }

    pub fn unit_price(&self) -> Option<Decimal> {
        self.unit_price
    }

    pub fn is_usable(&self) -> bool {
        self.condition == ConditionStatus::Usable
    }

    pub fn is_not_usable(&self) -> bool {
        self.condition == ConditionStatus::NotUsable
    }
}

/// A transaction being assembled. Lines can still be added or removed.
///
/// The only way out of the draft state is [`DraftTransaction::commit`], which
/// validates the lines and yields an immutable [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftTransaction {
    id: TransactionId,
    tx_type: TransactionType,
    tx_date: NaiveDate,
    reference: String,
    created_by: UserId,
    notes: String,
    created_at: DateTime<Utc>,
    lines: Vec<TransactionLine>,
}

impl DraftTransaction {
    /// Start a draft dated today (UTC).
    pub fn new(tx_type: TransactionType, reference: impl Into<String>, created_by: UserId) -> Self {
        let created_at = Utc::now();
        Self {
            id: TransactionId::new(),
            tx_type,
            tx_date: created_at.date_naive(),
            reference: reference.into(),
            created_by,
            notes: String::new(),
            created_at,
            lines: Vec::new(),
        }
    }

    /// Goods receipt.
    pub fn receive(reference: impl Into<String>, created_by: UserId) -> Self {
        Self::new(TransactionType::In, reference, created_by)
    }

    /// Goods issue.
    pub fn issue(reference: impl Into<String>, created_by: UserId) -> Self {
        Self::new(TransactionType::Out, reference, created_by)
    }

    pub fn dated(mut self, tx_date: NaiveDate) -> Self {
        self.tx_date = tx_date;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_line(mut self, line: NewLine) -> Self {
        self.add_line(line);
        self
    }

    pub fn add_line(&mut self, line: NewLine) -> LineId {
        let id = LineId::new();
        self.lines.push(TransactionLine {
            id,
            transaction_id: self.id,
            item_id: line.item_id,
            location_id: line.location_id,
            quantity: line.quantity,
            condition: line.condition,
            unit_price: line.unit_price,
        });
        id
    }

    /// Drop a line from the draft; returns whether it was present.
    pub fn remove_line(&mut self, line_id: LineId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != line_id);
        self.lines.len() != before
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn tx_type(&self) -> TransactionType {
        self.tx_type
    }

    pub fn tx_date(&self) -> NaiveDate {
        self.tx_date
    }

    pub fn lines(&self) -> &[TransactionLine] {
        &self.lines
    }

    /// Distinct item ids referenced by the lines, in ascending order.
    pub fn item_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.lines.iter().map(|l| l.item_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Validate the lines and freeze the draft.
    pub fn commit(self) -> DomainResult<Transaction> {
        validate_lines(self.tx_type, &self.lines)?;
        Ok(Transaction {
            id: self.id,
            tx_type: self.tx_type,
            tx_date: self.tx_date,
            reference: self.reference,
            created_by: self.created_by,
            notes: self.notes,
            created_at: self.created_at,
            lines: self.lines,
        })
    }
}

/// A committed, immutable stock transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    tx_type: TransactionType,
    tx_date: NaiveDate,
    reference: String,
    created_by: UserId,
    notes: String,
    created_at: DateTime<Utc>,
    lines: Vec<TransactionLine>,
}

impl Transaction {
    pub fn id_typed(&self) -> TransactionId {
        self.id
    }

    pub fn tx_type(&self) -> TransactionType {
        self.tx_type
    }

    pub fn tx_date(&self) -> NaiveDate {
        self.tx_date
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn lines(&self) -> &[TransactionLine] {
        &self.lines
    }

    pub fn is_inbound(&self) -> bool {
        self.tx_type == TransactionType::In
    }

    pub fn is_outbound(&self) -> bool {
        matches!(self.tx_type, TransactionType::Out | TransactionType::Disposition)
    }
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
