use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue, json};

use tillpoint_core::{EngineError, EngineResult, ItemId, ShopId, Unit};
use tillpoint_store::{
    DocumentStore, DocumentStoreExt, ExpectedRevision, StoreError, collections,
};

/// Retry budget for read-modify-write quantity updates. A conflict after this
/// many re-reads is surfaced to the caller.
const QUANTITY_RETRY_BUDGET: u32 = 5;

/// Catalog record for one stock item, scoped to a shop.
///
/// `quantity` never goes negative, and `unit` is stable for the item's whole
/// lifetime (a unit change is a new item's concern).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    pub id: ItemId,
    pub shop_id: ShopId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Selling price per unit.
    pub price: Decimal,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    pub quantity: Decimal,
    pub unit: Unit,
    /// SKU or barcode, used for exact-match lookups.
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub low_stock_threshold: Option<Decimal>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// Date of the most recent supplier purchase that touched this item.
    #[serde(default)]
    pub last_purchase_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a stock item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStockItem {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    pub quantity: Decimal,
    pub unit: Unit,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub low_stock_threshold: Option<Decimal>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// Partial update for a stock item. Absent fields are left untouched.
///
/// Deliberately has no `unit` field: the registry does not let a unit
/// silently change meaning under historical receipts and movements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub sku: Option<String>,
    pub low_stock_threshold: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
    pub last_purchase_date: Option<NaiveDate>,
}

impl ItemPatch {
    fn validate(&self) -> EngineResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(EngineError::validation("name cannot be empty"));
            }
        }
        for (label, value) in [
            ("price", self.price),
            ("cost price", self.cost_price),
            ("quantity", self.quantity),
        ] {
            if let Some(v) = value {
                if v < Decimal::ZERO {
                    return Err(EngineError::validation(format!(
                        "{label} cannot be negative"
                    )));
                }
            }
        }
        Ok(())
    }

    fn into_patch_json(self) -> JsonValue {
        let mut patch = JsonMap::new();
        if let Some(v) = self.name {
            patch.insert("name".to_string(), json!(v));
        }
        if let Some(v) = self.category {
            patch.insert("category".to_string(), json!(v));
        }
        if let Some(v) = self.description {
            patch.insert("description".to_string(), json!(v));
        }
        if let Some(v) = self.price {
            patch.insert("price".to_string(), json!(v));
        }
        if let Some(v) = self.cost_price {
            patch.insert("costPrice".to_string(), json!(v));
        }
        if let Some(v) = self.quantity {
            patch.insert("quantity".to_string(), json!(v));
        }
        if let Some(v) = self.sku {
            patch.insert("sku".to_string(), json!(v));
        }
        if let Some(v) = self.low_stock_threshold {
            patch.insert("lowStockThreshold".to_string(), json!(v));
        }
        if let Some(v) = self.expiry_date {
            patch.insert("expiryDate".to_string(), json!(v));
        }
        if let Some(v) = self.last_purchase_date {
            patch.insert("lastPurchaseDate".to_string(), json!(v));
        }
        patch.insert("updatedAt".to_string(), json!(Utc::now()));
        JsonValue::Object(patch)
    }
}

/// Stock item registry: owns catalog records for a shop.
///
/// The registry itself provides no cross-operation concurrency control;
/// quantity read-modify-write goes through [`ItemRegistry::adjust_quantity`],
/// which uses the store's revision check.
#[derive(Debug)]
pub struct ItemRegistry<S> {
    store: S,
}

impl<S: DocumentStore> ItemRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn create(&self, shop_id: ShopId, new_item: NewStockItem) -> EngineResult<ItemId> {
        if new_item.name.trim().is_empty() {
            return Err(EngineError::validation("name cannot be empty"));
        }
        if new_item.price < Decimal::ZERO {
            return Err(EngineError::validation("price cannot be negative"));
        }
        if new_item.quantity < Decimal::ZERO {
            return Err(EngineError::validation("quantity cannot be negative"));
        }
        if matches!(new_item.cost_price, Some(cost) if cost < Decimal::ZERO) {
            return Err(EngineError::validation("cost price cannot be negative"));
        }

        let now = Utc::now();
        let item = StockItem {
            id: ItemId::new(),
            shop_id,
            name: new_item.name,
            category: new_item.category,
            description: new_item.description,
            price: new_item.price,
            cost_price: new_item.cost_price,
            quantity: new_item.quantity,
            unit: new_item.unit,
            sku: new_item.sku,
            low_stock_threshold: new_item.low_stock_threshold,
            expiry_date: new_item.expiry_date,
            last_purchase_date: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(collections::STOCK_ITEMS, &item)?;
        Ok(item.id)
    }

    pub fn get(&self, item_id: ItemId) -> EngineResult<StockItem> {
        Ok(self
            .store
            .fetch(collections::STOCK_ITEMS, *item_id.as_uuid())?)
    }

    /// Partial update; recomputes `updatedAt`.
    pub fn update(&self, item_id: ItemId, patch: ItemPatch) -> EngineResult<()> {
        patch.validate()?;
        self.store.update_by_id(
            collections::STOCK_ITEMS,
            *item_id.as_uuid(),
            patch.into_patch_json(),
            ExpectedRevision::Any,
        )?;
        Ok(())
    }

    /// Unordered; callers sort as needed.
    pub fn list_by_shop(&self, shop_id: ShopId) -> EngineResult<Vec<StockItem>> {
        Ok(self
            .store
            .find(collections::STOCK_ITEMS, "shopId", &json!(shop_id))?)
    }

    /// Hard delete. No cascade: historical receipts and movements keep their
    /// denormalized name snapshots.
    pub fn delete(&self, item_id: ItemId) -> EngineResult<()> {
        self.store
            .delete_by_id(collections::STOCK_ITEMS, *item_id.as_uuid())?;
        Ok(())
    }

    /// First registry item in `shop_id` whose name matches `name` exactly
    /// (case-sensitive). Duplicate names are ambiguous; first match wins.
    pub fn find_first_by_name(
        &self,
        shop_id: ShopId,
        name: &str,
    ) -> EngineResult<Option<StockItem>> {
        let items: Vec<StockItem> = self
            .store
            .find(collections::STOCK_ITEMS, "shopId", &json!(shop_id))?;
        Ok(items.into_iter().find(|item| item.name == name))
    }

    /// Apply a quantity delta with an optimistic-concurrency retry loop.
    ///
    /// `floor_at_zero` clamps the result at zero (sale deductions); without
    /// it a negative result is a validation error. Returns the new quantity.
    pub fn adjust_quantity(
        &self,
        item_id: ItemId,
        delta: Decimal,
        floor_at_zero: bool,
    ) -> EngineResult<Decimal> {
        for _ in 0..QUANTITY_RETRY_BUDGET {
            let (item, rev): (StockItem, u64) = self
                .store
                .fetch_revisioned(collections::STOCK_ITEMS, *item_id.as_uuid())?;

            let mut next = item.quantity + delta;
            if next < Decimal::ZERO {
                if !floor_at_zero {
                    return Err(EngineError::validation("quantity cannot go negative"));
                }
                next = Decimal::ZERO;
            }

            let patch = json!({ "quantity": next, "updatedAt": Utc::now() });
            match self.store.update_by_id(
                collections::STOCK_ITEMS,
                *item_id.as_uuid(),
                patch,
                ExpectedRevision::Exact(rev),
            ) {
                Ok(()) => return Ok(next),
                Err(StoreError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::conflict(format!(
            "quantity update for item {item_id} kept racing, giving up"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tillpoint_store::InMemoryStore;

    fn registry() -> ItemRegistry<InMemoryStore> {
        ItemRegistry::new(InMemoryStore::new())
    }

    fn soap(quantity: Decimal) -> NewStockItem {
        NewStockItem {
            name: "Soap".to_string(),
            category: Some("toiletries".to_string()),
            description: None,
            price: dec!(2.50),
            cost_price: Some(dec!(1.80)),
            quantity,
            unit: Unit::Units,
            sku: Some("SOAP-01".to_string()),
            low_stock_threshold: Some(dec!(5)),
            expiry_date: None,
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let registry = registry();
        let shop = ShopId::new();

        let id = registry.create(shop, soap(dec!(10))).unwrap();
        let item = registry.get(id).unwrap();

        assert_eq!(item.id, id);
        assert_eq!(item.shop_id, shop);
        assert_eq!(item.name, "Soap");
        assert_eq!(item.quantity, dec!(10));
        assert_eq!(item.unit, Unit::Units);
    }

    #[test]
    fn create_rejects_malformed_input() {
        let registry = registry();
        let shop = ShopId::new();

        let mut no_name = soap(dec!(1));
        no_name.name = "  ".to_string();
        assert!(matches!(
            registry.create(shop, no_name),
            Err(EngineError::Validation(_))
        ));

        let mut negative_price = soap(dec!(1));
        negative_price.price = dec!(-1);
        assert!(matches!(
            registry.create(shop, negative_price),
            Err(EngineError::Validation(_))
        ));

        let mut negative_qty = soap(dec!(-3));
        negative_qty.quantity = dec!(-3);
        assert!(matches!(
            registry.create(shop, negative_qty),
            Err(EngineError::Validation(_))
        ));

        let mut negative_cost = soap(dec!(1));
        negative_cost.cost_price = Some(dec!(-0.5));
        assert!(matches!(
            registry.create(shop, negative_cost),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn get_missing_item_is_not_found() {
        let registry = registry();
        assert!(matches!(
            registry.get(ItemId::new()),
            Err(EngineError::NotFound)
        ));
    }

    #[test]
    fn update_patches_only_given_fields() {
        let registry = registry();
        let shop = ShopId::new();
        let id = registry.create(shop, soap(dec!(10))).unwrap();

        registry
            .update(
                id,
                ItemPatch {
                    price: Some(dec!(3.00)),
                    ..ItemPatch::default()
                },
            )
            .unwrap();

        let item = registry.get(id).unwrap();
        assert_eq!(item.price, dec!(3.00));
        assert_eq!(item.quantity, dec!(10));
        assert_eq!(item.name, "Soap");
        assert!(item.updated_at >= item.created_at);
    }

    #[test]
    fn list_by_shop_is_scoped() {
        let registry = registry();
        let shop_a = ShopId::new();
        let shop_b = ShopId::new();

        registry.create(shop_a, soap(dec!(1))).unwrap();
        registry.create(shop_a, soap(dec!(2))).unwrap();
        registry.create(shop_b, soap(dec!(3))).unwrap();

        assert_eq!(registry.list_by_shop(shop_a).unwrap().len(), 2);
        assert_eq!(registry.list_by_shop(shop_b).unwrap().len(), 1);
    }

    #[test]
    fn delete_is_hard() {
        let registry = registry();
        let shop = ShopId::new();
        let id = registry.create(shop, soap(dec!(1))).unwrap();

        registry.delete(id).unwrap();
        assert!(matches!(registry.get(id), Err(EngineError::NotFound)));
    }

    #[test]
    fn adjust_quantity_floors_at_zero_when_asked() {
        let registry = registry();
        let shop = ShopId::new();
        let id = registry.create(shop, soap(dec!(3))).unwrap();

        let left = registry.adjust_quantity(id, dec!(-5), true).unwrap();
        assert_eq!(left, Decimal::ZERO);

        let err = registry.adjust_quantity(id, dec!(-1), false).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn find_first_by_name_is_exact_and_case_sensitive() {
        let registry = registry();
        let shop = ShopId::new();
        registry.create(shop, soap(dec!(1))).unwrap();

        assert!(registry.find_first_by_name(shop, "Soap").unwrap().is_some());
        assert!(registry.find_first_by_name(shop, "soap").unwrap().is_none());
        assert!(registry.find_first_by_name(shop, "Soa").unwrap().is_none());
    }
}
