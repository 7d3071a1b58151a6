//! `tillpoint-engine` — facade wiring the registry, movement ledger,
//! reconciler, purchase intake, and loan ledger over one document store.
//!
//! Receipt-layer callers (checkout, back office) talk to [`PosEngine`]; the
//! service crates stay independently usable underneath.

use rust_decimal::Decimal;

use tillpoint_core::{
    EngineResult, ItemId, LoanEntryId, MovementId, PurchaseId, ShopId, TransactionId,
};
use tillpoint_inventory::{
    ItemPatch, ItemRegistry, MovementLedger, NewMovement, NewStockItem, Reconciler, SaleLine,
    StockItem, StockMovement,
};
use tillpoint_loans::{AllocationOutcome, LoanEntry, LoanLedger, LoanPayment};
pub use tillpoint_loans::LoanStatus;
use tillpoint_purchasing::{PurchaseIntake, PurchasePayload, PurchaseRecord};
use tillpoint_store::DocumentStore;

/// Engine-level configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Placeholder customer name the checkout layer uses for anonymous
    /// sales. Loans against it are dropped, not recorded.
    pub walk_in_customer: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            walk_in_customer: "Walk-in customer".to_string(),
        }
    }
}

/// One engine instance per process, generic over the storage backend.
#[derive(Debug)]
pub struct PosEngine<S> {
    config: EngineConfig,
    registry: ItemRegistry<S>,
    movements: MovementLedger<S>,
    reconciler: Reconciler<S>,
    intake: PurchaseIntake<S>,
    loans: LoanLedger<S>,
}

impl<S: DocumentStore + Clone> PosEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self {
            config,
            registry: ItemRegistry::new(store.clone()),
            movements: MovementLedger::new(store.clone()),
            reconciler: Reconciler::new(store.clone()),
            intake: PurchaseIntake::new(store.clone()),
            loans: LoanLedger::new(store),
        }
    }

    // ---- stock item registry (back office) ----

    pub fn create_item(&self, shop_id: ShopId, item: NewStockItem) -> EngineResult<ItemId> {
        self.registry.create(shop_id, item)
    }

    pub fn get_item(&self, item_id: ItemId) -> EngineResult<StockItem> {
        self.registry.get(item_id)
    }

    pub fn update_item(&self, item_id: ItemId, patch: ItemPatch) -> EngineResult<()> {
        self.registry.update(item_id, patch)
    }

    pub fn list_items(&self, shop_id: ShopId) -> EngineResult<Vec<StockItem>> {
        self.registry.list_by_shop(shop_id)
    }

    pub fn delete_item(&self, item_id: ItemId) -> EngineResult<()> {
        self.registry.delete(item_id)
    }

    // ---- stock movement ledger ----

    pub fn record_movement(&self, movement: NewMovement) -> EngineResult<MovementId> {
        self.movements.record(movement)
    }

    /// Movements for a shop, newest first, optionally narrowed to one item.
    pub fn list_movements(
        &self,
        shop_id: ShopId,
        item_filter: Option<ItemId>,
    ) -> EngineResult<Vec<StockMovement>> {
        self.movements.list_by_shop(shop_id, item_filter)
    }

    // ---- quantity reconciliation (checkout) ----

    pub fn apply_sale(&self, shop_id: ShopId, lines: &[SaleLine]) -> EngineResult<()> {
        self.reconciler.apply_sale(shop_id, lines)
    }

    pub fn apply_return(&self, shop_id: ShopId, lines: &[SaleLine]) -> EngineResult<()> {
        self.reconciler.apply_return(shop_id, lines)
    }

    // ---- purchase intake ----

    pub fn create_purchase(
        &self,
        shop_id: ShopId,
        payload: PurchasePayload,
    ) -> EngineResult<PurchaseRecord> {
        self.intake.create_purchase(shop_id, payload)
    }

    pub fn get_purchase(&self, purchase_id: PurchaseId) -> EngineResult<PurchaseRecord> {
        self.intake.get(purchase_id)
    }

    pub fn list_purchases(&self, shop_id: ShopId) -> EngineResult<Vec<PurchaseRecord>> {
        self.intake.list_purchases(shop_id)
    }

    // ---- customer loans ----

    /// Record the credit portion of a sale.
    ///
    /// Walk-in/anonymous sales and non-positive amounts are a no-op
    /// (`Ok(None)`): the checkout layer calls this unconditionally for every
    /// receipt and the guard lives here, not at every call site.
    pub fn record_loan(
        &self,
        shop_id: ShopId,
        customer_name: &str,
        transaction_id: TransactionId,
        amount: Decimal,
    ) -> EngineResult<Option<LoanEntryId>> {
        let name = customer_name.trim();
        if name.is_empty()
            || name.eq_ignore_ascii_case(&self.config.walk_in_customer)
            || amount <= Decimal::ZERO
        {
            tracing::debug!(
                shop_id = %shop_id,
                customer = %customer_name,
                %amount,
                "loan not recorded: walk-in customer or non-positive amount"
            );
            return Ok(None);
        }

        self.loans
            .record_loan(shop_id, name, transaction_id, amount)
            .map(Some)
    }

    pub fn allocate_payment(
        &self,
        shop_id: ShopId,
        customer_name: &str,
        payment_amount: Decimal,
    ) -> EngineResult<AllocationOutcome> {
        self.loans
            .allocate_payment(shop_id, customer_name, payment_amount)
    }

    pub fn list_loans(&self, shop_id: ShopId) -> EngineResult<Vec<LoanEntry>> {
        self.loans.list_by_shop(shop_id)
    }

    pub fn outstanding_loans(
        &self,
        shop_id: ShopId,
        customer_name: &str,
    ) -> EngineResult<Vec<LoanEntry>> {
        self.loans.outstanding_for_customer(shop_id, customer_name)
    }

    pub fn list_loan_payments(&self, shop_id: ShopId) -> EngineResult<Vec<LoanPayment>> {
        self.loans.list_payments(shop_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tillpoint_store::InMemoryStore;

    fn engine() -> PosEngine<Arc<InMemoryStore>> {
        PosEngine::new(Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn walk_in_loan_is_a_no_op() {
        let engine = engine();
        let shop = ShopId::new();

        let recorded = engine
            .record_loan(shop, "Walk-in customer", TransactionId::new(), dec!(50))
            .unwrap();
        assert!(recorded.is_none());
        assert!(engine.list_loans(shop).unwrap().is_empty());
    }

    #[test]
    fn walk_in_guard_is_case_insensitive_and_covers_blank_names() {
        let engine = engine();
        let shop = ShopId::new();

        for name in ["WALK-IN CUSTOMER", "walk-in customer", "   "] {
            let recorded = engine
                .record_loan(shop, name, TransactionId::new(), dec!(10))
                .unwrap();
            assert!(recorded.is_none(), "expected no loan for {name:?}");
        }
    }

    #[test]
    fn non_positive_amount_records_nothing() {
        let engine = engine();
        let shop = ShopId::new();

        let recorded = engine
            .record_loan(shop, "Asha", TransactionId::new(), dec!(0))
            .unwrap();
        assert!(recorded.is_none());
    }

    #[test]
    fn named_customer_loan_is_recorded() {
        let engine = engine();
        let shop = ShopId::new();

        let recorded = engine
            .record_loan(shop, "Asha", TransactionId::new(), dec!(75))
            .unwrap();
        assert!(recorded.is_some());

        let loans = engine.list_loans(shop).unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].remaining_amount, dec!(75));
    }

    #[test]
    fn custom_placeholder_name_is_honored() {
        let engine = PosEngine::with_config(
            Arc::new(InMemoryStore::new()),
            EngineConfig {
                walk_in_customer: "Comptoir".to_string(),
            },
        );
        let shop = ShopId::new();

        let recorded = engine
            .record_loan(shop, "comptoir", TransactionId::new(), dec!(10))
            .unwrap();
        assert!(recorded.is_none());

        let recorded = engine
            .record_loan(shop, "Walk-in customer", TransactionId::new(), dec!(10))
            .unwrap();
        assert!(recorded.is_some());
    }
}
