//! Persistence Gateway boundary.
//!
//! Items, the transaction journal and report queries live behind this port.
//! The in-memory adapter backs tests/dev; a remote backend would be another
//! implementation of the same trait.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryGateway;
pub use r#trait::{GatewayError, PersistenceGateway, TransactionReportRow};
