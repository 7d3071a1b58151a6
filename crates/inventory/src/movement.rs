use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use tillpoint_core::{EngineError, EngineResult, ItemId, MovementId, ShopId, Unit};
use tillpoint_store::{DocumentStore, DocumentStoreExt, collections};

/// Direction of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

/// Immutable audit record of one quantity change.
///
/// `item_name` is a denormalized snapshot so the history stays readable after
/// the item is deleted or renamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: MovementId,
    pub shop_id: ShopId,
    pub item_id: ItemId,
    pub item_name: String,
    pub direction: Direction,
    pub quantity: Decimal,
    pub unit: Unit,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a movement.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub shop_id: ShopId,
    pub item_id: ItemId,
    pub item_name: String,
    pub direction: Direction,
    pub quantity: Decimal,
    pub unit: Unit,
    pub cost_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub reference: Option<String>,
    pub note: Option<String>,
}

/// Append-only movement ledger.
///
/// This is the audit trail that lets quantity drift be investigated. Records
/// are never corrected in place, only compensated by a new movement, so there
/// is no update operation here at all.
#[derive(Debug)]
pub struct MovementLedger<S> {
    store: S,
}

impl<S: DocumentStore> MovementLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Append a movement. Never rejects on business grounds (history sink);
    /// only malformed input fails.
    pub fn record(&self, movement: NewMovement) -> EngineResult<MovementId> {
        if movement.quantity <= Decimal::ZERO {
            return Err(EngineError::validation("movement quantity must be positive"));
        }

        let record = StockMovement {
            id: MovementId::new(),
            shop_id: movement.shop_id,
            item_id: movement.item_id,
            item_name: movement.item_name,
            direction: movement.direction,
            quantity: movement.quantity,
            unit: movement.unit,
            cost_price: movement.cost_price,
            supplier: movement.supplier,
            reference: movement.reference,
            note: movement.note,
            created_at: Utc::now(),
        };

        self.store.insert(collections::STOCK_MOVEMENTS, &record)?;
        Ok(record.id)
    }

    /// All movements for a shop, newest first, optionally filtered to one item.
    pub fn list_by_shop(
        &self,
        shop_id: ShopId,
        item_filter: Option<ItemId>,
    ) -> EngineResult<Vec<StockMovement>> {
        let mut movements: Vec<StockMovement> = self
            .store
            .find(collections::STOCK_MOVEMENTS, "shopId", &json!(shop_id))?;

        if let Some(item_id) = item_filter {
            movements.retain(|m| m.item_id == item_id);
        }

        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(movements)
    }
}
