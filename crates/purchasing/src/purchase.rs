use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillpoint_core::{ItemId, PurchaseId, ShopId, Unit};

/// One line of an incoming supplier purchase.
///
/// `source_item_id` set means "restock this existing item"; `None` means
/// "register a new item from this line".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLineInput {
    #[serde(default)]
    pub source_item_id: Option<ItemId>,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: Unit,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub selling_price: Option<Decimal>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub low_stock_threshold: Option<Decimal>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

impl PurchaseLineInput {
    /// A line is processable when it has a name and a positive quantity.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && self.quantity > Decimal::ZERO
    }
}

/// A supplier purchase as submitted by the back office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePayload {
    pub supplier: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    pub lines: Vec<PurchaseLineInput>,
}

/// A fully resolved purchase line as stored on the purchase record.
///
/// `item_id` is the registry item the line landed on — either the restocked
/// source item or the newly created one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLine {
    pub item_id: ItemId,
    #[serde(default)]
    pub source_item_id: Option<ItemId>,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: Unit,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub selling_price: Option<Decimal>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// Durable record of one supplier purchase. Immutable once created; read
/// back only for listing and reprinting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub id: PurchaseId,
    pub shop_id: ShopId,
    pub supplier: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    pub items: Vec<PurchaseLine>,
    pub created_at: DateTime<Utc>,
}
