//! `tillpoint-inventory` — stock item registry, movement ledger, and the
//! quantity reconciler that keeps registry quantities consistent with sales
//! and returns.

pub mod item;
pub mod movement;
pub mod reconcile;

pub use item::{ItemPatch, ItemRegistry, NewStockItem, StockItem};
pub use movement::{Direction, MovementLedger, NewMovement, StockMovement};
pub use reconcile::{Reconciler, SaleLine};
