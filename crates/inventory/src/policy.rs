//! Guards that decide whether a transaction may be committed.
//!
//! Two layers:
//! - [`validate_lines`]: structural checks that need nothing but the lines.
//!   Run on every commit.
//! - [`PolicyEngine::check`]: the structural checks plus stock sufficiency,
//!   which needs the current balance of each referenced item.

use std::collections::HashMap;

use rust_decimal::Decimal;

use stockbook_core::{DomainError, DomainResult, ItemId};

use crate::balance::{StockCalculator, StockPolicy};
use crate::transaction::{ConditionStatus, DraftTransaction, TransactionLine, TransactionType};

/// Check one line in the context of its transaction type.
pub fn check_line(tx_type: TransactionType, line: &TransactionLine) -> DomainResult<()> {
    match tx_type {
        TransactionType::Adjust => {
            if line.quantity() == 0 {
                return Err(DomainError::validation("adjustment quantity cannot be zero"));
            }
        }
        TransactionType::In | TransactionType::Out | TransactionType::Disposition => {
            if line.quantity() <= 0 {
                return Err(DomainError::validation("quantity must be positive"));
            }
        }
    }

    if line.condition() == ConditionStatus::NotUsable
        && !matches!(tx_type, TransactionType::Out | TransactionType::Disposition)
    {
        return Err(DomainError::validation(format!(
            "NOT_USABLE condition is not allowed on {tx_type} lines"
        )));
    }

    if line.unit_price().is_some_and(|price| price < Decimal::ZERO) {
        return Err(DomainError::validation("unit price cannot be negative"));
    }

    Ok(())
}

/// Check that a transaction has lines and that every line is well formed.
pub fn validate_lines(tx_type: TransactionType, lines: &[TransactionLine]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::validation("transaction must have at least one line"));
    }
    lines.iter().try_for_each(|line| check_line(tx_type, line))
}

/// Whether a line is subject to the stock sufficiency guard.
pub fn is_guarded(tx_type: TransactionType, condition: ConditionStatus) -> bool {
    match tx_type {
        TransactionType::Out => true,
        TransactionType::Disposition => condition == ConditionStatus::Usable,
        TransactionType::In | TransactionType::Adjust => false,
    }
}

/// Validation and stock-sufficiency engine, parameterized by an explicit policy.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PolicyEngine {
    policy: StockPolicy,
}

impl PolicyEngine {
    pub fn new(policy: StockPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> StockPolicy {
        self.policy
    }

    /// Validate `draft` against current balances.
    ///
    /// `balance_of` is asked once per distinct item, in line order. The running
    /// balance then absorbs each line's contribution, so a later line in the
    /// same transaction sees the effect of earlier ones.
    ///
    /// With `allow_negative_stock` off, a guarded line whose quantity exceeds the
    /// running balance fails with [`DomainError::InsufficientStock`]. A line that
    /// would push the balance past the `i64` range is a validation error.
    pub fn check<E, F>(&self, draft: &DraftTransaction, mut balance_of: F) -> Result<(), E>
    where
        F: FnMut(ItemId) -> Result<i64, E>,
        E: From<DomainError>,
    {
        validate_lines(draft.tx_type(), draft.lines())?;

        let calculator = StockCalculator::new(self.policy);
        let mut running: HashMap<ItemId, i64> = HashMap::new();

        for line in draft.lines() {
            let item_id = line.item_id();
            let available = match running.get(&item_id) {
                Some(balance) => *balance,
                None => balance_of(item_id)?,
            };

            if !self.policy.allow_negative_stock
                && is_guarded(draft.tx_type(), line.condition())
                && available < line.quantity()
            {
                return Err(DomainError::insufficient_stock(available, line.quantity()).into());
            }

            let delta = calculator.contribution(draft.tx_type(), line.condition(), line.quantity());
            let next = available
                .checked_add(delta)
                .ok_or_else(|| DomainError::validation("stock balance out of range"))?;
            running.insert(item_id, next);
        }

        Ok(())
    }
}
