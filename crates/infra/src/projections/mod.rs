//! Read-model projections.

pub mod stock_levels;

pub use stock_levels::{StockLevel, StockLevelProjection};
