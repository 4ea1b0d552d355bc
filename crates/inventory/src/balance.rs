//! Stock balance rule: how each journal line moves the on-hand quantity.
//!
//! Balances are never stored on the item; they are folded from the journal:
//!
//! | type        | condition  | contribution                                  |
//! |-------------|------------|-----------------------------------------------|
//! | IN          | any        | `+qty`                                        |
//! | OUT         | any        | `-qty`                                        |
//! | ADJUST      | any        | `+qty` (qty is signed)                        |
//! | DISPOSITION | USABLE     | `-qty`                                        |
//! | DISPOSITION | NOT_USABLE | `-qty` if `count_non_usable_as_outgoing`, else 0 |

use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, DomainResult, ValueObject};

use crate::journal::JournalLine;
use crate::transaction::{ConditionStatus, Transaction, TransactionLine, TransactionType};

/// Policy switches that change stock semantics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockPolicy {
    /// Whether written-off, not-usable goods reduce the on-hand balance.
    pub count_non_usable_as_outgoing: bool,
    /// Whether issues may take the balance below zero.
    pub allow_negative_stock: bool,
}

impl StockPolicy {
    pub fn new(count_non_usable_as_outgoing: bool, allow_negative_stock: bool) -> Self {
        Self {
            count_non_usable_as_outgoing,
            allow_negative_stock,
        }
    }
}

impl Default for StockPolicy {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ValueObject for StockPolicy {}

/// Anything that can be read as a single signed stock movement.
pub trait StockMovement {
    fn transaction_type(&self) -> TransactionType;
    fn condition(&self) -> ConditionStatus;
    fn quantity(&self) -> i64;
}

impl<T: StockMovement + ?Sized> StockMovement for &T {
    fn transaction_type(&self) -> TransactionType {
        (**self).transaction_type()
    }

    fn condition(&self) -> ConditionStatus {
        (**self).condition()
    }

    fn quantity(&self) -> i64 {
        (**self).quantity()
    }
}

impl StockMovement for (&Transaction, &TransactionLine) {
    fn transaction_type(&self) -> TransactionType {
        self.0.tx_type()
    }

    fn condition(&self) -> ConditionStatus {
        self.1.condition()
    }

    fn quantity(&self) -> i64 {
        self.1.quantity()
    }
}

impl StockMovement for JournalLine {
    fn transaction_type(&self) -> TransactionType {
        self.tx_type
    }

    fn condition(&self) -> ConditionStatus {
        self.line.condition()
    }

    fn quantity(&self) -> i64 {
        self.line.quantity()
    }
}

/// Folds journal lines into an on-hand balance under a fixed policy.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct StockCalculator {
    policy: StockPolicy,
}

impl StockCalculator {
    pub fn new(policy: StockPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> StockPolicy {
        self.policy
    }

    /// Signed effect of one line on the balance.
    pub fn contribution(&self, tx_type: TransactionType, condition: ConditionStatus, quantity: i64) -> i64 {
        match (tx_type, condition) {
            (TransactionType::In, _) | (TransactionType::Adjust, _) => quantity,
            (TransactionType::Out, _) => -quantity,
            (TransactionType::Disposition, ConditionStatus::Usable) => -quantity,
            (TransactionType::Disposition, ConditionStatus::NotUsable) => {
                if self.policy.count_non_usable_as_outgoing {
                    -quantity
                } else {
                    0
                }
            }
        }
    }

    pub fn contribution_of(&self, movement: &impl StockMovement) -> i64 {
        self.contribution(movement.transaction_type(), movement.condition(), movement.quantity())
    }

    /// Current balance: the sum of every movement's contribution.
    ///
    /// Fails instead of wrapping when the running sum leaves the `i64` range.
    pub fn balance<M: StockMovement>(&self, movements: impl IntoIterator<Item = M>) -> DomainResult<i64> {
        movements.into_iter().try_fold(0i64, |total, m| {
            total
                .checked_add(self.contribution_of(&m))
                .ok_or_else(|| DomainError::validation("stock balance out of range"))
        })
    }
}
