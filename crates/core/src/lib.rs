//! `tillpoint-core` — shared domain primitives.
//!
//! This crate contains **pure domain** building blocks (no persistence or
//! logging concerns): strongly-typed identifiers, the engine error taxonomy,
//! and the quantity unit type.

pub mod error;
pub mod id;
pub mod unit;

pub use error::{EngineError, EngineResult};
pub use id::{ItemId, LoanEntryId, LoanPaymentId, MovementId, PurchaseId, ShopId, TransactionId};
pub use unit::Unit;
