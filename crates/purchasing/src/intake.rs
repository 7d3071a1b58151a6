use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;

use tillpoint_core::{EngineError, EngineResult, ItemId, PurchaseId, ShopId};
use tillpoint_inventory::{
    Direction, ItemPatch, ItemRegistry, MovementLedger, NewMovement, NewStockItem,
};
use tillpoint_store::{DocumentStore, DocumentStoreExt, collections};

use crate::purchase::{PurchaseLine, PurchaseLineInput, PurchasePayload, PurchaseRecord};

/// Purchase intake processor.
///
/// Converts a supplier purchase into registry effects (restock or new item),
/// one `IN` movement per line, and a durable purchase record. Atomic from
/// the caller's point of view only: the storage layer has no multi-document
/// transaction, so a mid-purchase failure leaves earlier lines applied.
#[derive(Debug)]
pub struct PurchaseIntake<S> {
    store: S,
    registry: ItemRegistry<S>,
    ledger: MovementLedger<S>,
}

impl<S: DocumentStore + Clone> PurchaseIntake<S> {
    pub fn new(store: S) -> Self {
        Self {
            registry: ItemRegistry::new(store.clone()),
            ledger: MovementLedger::new(store.clone()),
            store,
        }
    }

    /// Process a purchase, line by line, in input order.
    ///
    /// Fails fast with a validation error before any mutation when no line
    /// is processable. A failed restock of a referenced item falls back to
    /// creating a new item rather than aborting the whole purchase: one bad
    /// reference must not block the rest of the intake.
    pub fn create_purchase(
        &self,
        shop_id: ShopId,
        payload: PurchasePayload,
    ) -> EngineResult<PurchaseRecord> {
        if !payload.lines.iter().any(PurchaseLineInput::is_valid) {
            return Err(EngineError::validation(
                "purchase has no line item with a name and a positive quantity",
            ));
        }

        let mut items = Vec::with_capacity(payload.lines.len());
        for line in &payload.lines {
            if !line.is_valid() {
                tracing::warn!(
                    shop_id = %shop_id,
                    line_name = %line.name,
                    "purchase line skipped: missing name or non-positive quantity"
                );
                continue;
            }

            // Explicit two-branch flow: try the referenced item first, fall
            // through to new-item creation on any failure. One failed read is
            // treated as permanent absence (no retry).
            let item_id = match line.source_item_id {
                Some(source) => match self.restock_existing(shop_id, source, line, &payload) {
                    Ok(item_id) => item_id,
                    Err(err) => {
                        tracing::warn!(
                            shop_id = %shop_id,
                            source_item_id = %source,
                            line_name = %line.name,
                            error = %err,
                            "restock of referenced item failed, creating a new item instead"
                        );
                        self.create_new_item(shop_id, line, &payload)?
                    }
                },
                None => self.create_new_item(shop_id, line, &payload)?,
            };

            items.push(PurchaseLine {
                item_id,
                source_item_id: line.source_item_id,
                name: line.name.clone(),
                category: line.category.clone(),
                description: line.description.clone(),
                quantity: line.quantity,
                unit: line.unit.clone(),
                cost_price: line.cost_price,
                selling_price: line.selling_price,
                expiry_date: line.expiry_date,
            });
        }

        let record = PurchaseRecord {
            id: PurchaseId::new(),
            shop_id,
            supplier: payload.supplier,
            invoice_number: payload.invoice_number,
            purchase_date: payload.purchase_date,
            note: payload.note,
            reference: payload.reference,
            items,
            created_at: Utc::now(),
        };

        self.store.insert(collections::PURCHASE_ORDERS, &record)?;
        Ok(record)
    }

    /// Read a purchase back (reprinting).
    pub fn get(&self, purchase_id: PurchaseId) -> EngineResult<PurchaseRecord> {
        Ok(self
            .store
            .fetch(collections::PURCHASE_ORDERS, *purchase_id.as_uuid())?)
    }

    /// All purchases for a shop, newest first.
    pub fn list_purchases(&self, shop_id: ShopId) -> EngineResult<Vec<PurchaseRecord>> {
        let mut purchases: Vec<PurchaseRecord> = self
            .store
            .find(collections::PURCHASE_ORDERS, "shopId", &json!(shop_id))?;
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(purchases)
    }

    fn restock_existing(
        &self,
        shop_id: ShopId,
        item_id: ItemId,
        line: &PurchaseLineInput,
        payload: &PurchasePayload,
    ) -> EngineResult<ItemId> {
        let item = self.registry.get(item_id)?;
        if item.shop_id != shop_id {
            return Err(EngineError::not_found());
        }

        self.registry.adjust_quantity(item_id, line.quantity, false)?;

        let patch = ItemPatch {
            cost_price: line.cost_price,
            low_stock_threshold: line.low_stock_threshold,
            expiry_date: line.expiry_date,
            last_purchase_date: payload.purchase_date,
            ..ItemPatch::default()
        };
        if patch != ItemPatch::default() {
            self.registry.update(item_id, patch)?;
        }

        self.record_intake_movement(shop_id, item_id, &item.name, line, payload)?;
        Ok(item_id)
    }

    fn create_new_item(
        &self,
        shop_id: ShopId,
        line: &PurchaseLineInput,
        payload: &PurchasePayload,
    ) -> EngineResult<ItemId> {
        let item_id = self.registry.create(
            shop_id,
            NewStockItem {
                name: line.name.clone(),
                category: line.category.clone(),
                description: line.description.clone(),
                price: line.selling_price.unwrap_or(Decimal::ZERO),
                cost_price: line.cost_price,
                quantity: line.quantity,
                unit: line.unit.clone(),
                sku: line.sku.clone(),
                low_stock_threshold: line.low_stock_threshold,
                expiry_date: line.expiry_date,
            },
        )?;

        self.record_intake_movement(shop_id, item_id, &line.name, line, payload)?;
        Ok(item_id)
    }

    fn record_intake_movement(
        &self,
        shop_id: ShopId,
        item_id: ItemId,
        item_name: &str,
        line: &PurchaseLineInput,
        payload: &PurchasePayload,
    ) -> EngineResult<()> {
        self.ledger.record(NewMovement {
            shop_id,
            item_id,
            item_name: item_name.to_string(),
            direction: Direction::In,
            quantity: line.quantity,
            unit: line.unit.clone(),
            cost_price: line.cost_price,
            supplier: Some(payload.supplier.clone()),
            reference: payload.reference.clone(),
            note: payload.note.clone(),
        })?;
        Ok(())
    }
}
