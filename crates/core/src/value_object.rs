//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// A value object has no identity: two instances holding the same attributes are
/// interchangeable. `StockPolicy` is one; items and transactions are entities
/// tracked by id.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
