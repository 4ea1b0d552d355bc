//! Inventory domain: items, stock transactions and the balance rules.
//!
//! Pure, deterministic domain logic (no IO, no storage, no global settings).
//! Policy flags always arrive as an explicit [`StockPolicy`] value.

pub mod balance;
pub mod item;
pub mod journal;
pub mod palindrome;
pub mod policy;
pub mod transaction;

pub use balance::{StockCalculator, StockMovement, StockPolicy};
pub use item::{Item, ItemChanges, NewItem};
pub use journal::{Journal, JournalLine};
pub use palindrome::{is_palindrome, palindrome_status};
pub use policy::{PolicyEngine, check_line, is_guarded, validate_lines};
pub use transaction::{
    ConditionStatus, DraftTransaction, NewLine, Transaction, TransactionLine, TransactionType,
};
