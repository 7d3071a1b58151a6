//! `tillpoint-purchasing` — purchase intake: turns a supplier purchase into
//! registry updates, `IN` movements, and a durable purchase record.

pub mod intake;
pub mod purchase;

pub use intake::PurchaseIntake;
pub use purchase::{PurchaseLine, PurchaseLineInput, PurchasePayload, PurchaseRecord};
