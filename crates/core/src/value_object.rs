//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values
/// (`Money`, `Sku`, `LineItem`). To "modify" one, build a new one.
///
/// ```ignore
/// let a = Money::from_cents(250_00);
/// let b = Money::from_cents(250_00);
/// assert_eq!(a, b);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
