//! `hearth-core`: domain foundation shared by the quoting crates.
//!
//! Pure building blocks only: identifiers, money, errors and the aggregate /
//! event traits. Nothing in here performs IO.

pub mod aggregate;
pub mod context;
pub mod error;
pub mod event;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use context::SessionContext;
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{AggregateId, TenantId, UserId};
pub use money::{Money, MoneyParseError};
pub use value_object::ValueObject;
