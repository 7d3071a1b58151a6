use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillpoint_core::{EngineError, EngineResult, ShopId, Unit};
use tillpoint_store::DocumentStore;

use crate::item::ItemRegistry;

/// One row of a sale or return, as handed over by the receipt layer.
///
/// Matching against the registry is by exact item name; `unit`, when present,
/// must equal the stored unit or the line is skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub name: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: Option<Unit>,
}

#[derive(Debug, Copy, Clone)]
enum LineKind {
    Sale,
    Return,
}

impl LineKind {
    fn label(self) -> &'static str {
        match self {
            LineKind::Sale => "sale",
            LineKind::Return => "return",
        }
    }
}

/// Quantity reconciler: applies sale-driven deductions and return-driven
/// restorations to the registry.
///
/// Unmatched lines and unit mismatches are skipped without error ("best
/// effort": checkout must not block on a catalog gap), but each skip is
/// logged so drift can be investigated. The reconciler does not write
/// movement records; intake is the only movement producer.
#[derive(Debug)]
pub struct Reconciler<S> {
    registry: ItemRegistry<S>,
}

impl<S: DocumentStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self {
            registry: ItemRegistry::new(store),
        }
    }

    /// Deduct sold quantities. A deduction below zero clamps at zero.
    pub fn apply_sale(&self, shop_id: ShopId, lines: &[SaleLine]) -> EngineResult<()> {
        for line in lines {
            self.adjust_line(shop_id, line, LineKind::Sale)?;
        }
        Ok(())
    }

    /// Restore returned quantities. Bounding a return by the originally sold
    /// quantity is the caller's responsibility.
    pub fn apply_return(&self, shop_id: ShopId, lines: &[SaleLine]) -> EngineResult<()> {
        for line in lines {
            self.adjust_line(shop_id, line, LineKind::Return)?;
        }
        Ok(())
    }

    fn adjust_line(&self, shop_id: ShopId, line: &SaleLine, kind: LineKind) -> EngineResult<()> {
        if line.quantity < Decimal::ZERO {
            return Err(EngineError::validation(format!(
                "{} line quantity cannot be negative",
                kind.label()
            )));
        }

        let Some(item) = self.registry.find_first_by_name(shop_id, &line.name)? else {
            tracing::warn!(
                shop_id = %shop_id,
                line_name = %line.name,
                "{} line skipped: no item with matching name",
                kind.label()
            );
            return Ok(());
        };

        if let Some(unit) = &line.unit {
            if *unit != item.unit {
                tracing::warn!(
                    shop_id = %shop_id,
                    line_name = %line.name,
                    line_unit = %unit,
                    item_unit = %item.unit,
                    "{} line skipped: unit mismatch",
                    kind.label()
                );
                return Ok(());
            }
        }

        let (delta, floor_at_zero) = match kind {
            LineKind::Sale => (-line.quantity, true),
            LineKind::Return => (line.quantity, false),
        };

        self.registry.adjust_quantity(item.id, delta, floor_at_zero)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tillpoint_core::ItemId;
    use tillpoint_store::InMemoryStore;

    use crate::item::{ItemRegistry, NewStockItem};

    fn stocked_item(name: &str, quantity: Decimal, unit: Unit) -> NewStockItem {
        NewStockItem {
            name: name.to_string(),
            category: None,
            description: None,
            price: dec!(1.00),
            cost_price: None,
            quantity,
            unit,
            sku: None,
            low_stock_threshold: None,
            expiry_date: None,
        }
    }

    fn setup(name: &str, quantity: Decimal, unit: Unit) -> (Arc<InMemoryStore>, ShopId, ItemId) {
        let store = Arc::new(InMemoryStore::new());
        let shop = ShopId::new();
        let id = ItemRegistry::new(store.clone())
            .create(shop, stocked_item(name, quantity, unit))
            .unwrap();
        (store, shop, id)
    }

    fn line(name: &str, quantity: Decimal, unit: Option<Unit>) -> SaleLine {
        SaleLine {
            name: name.to_string(),
            quantity,
            unit,
        }
    }

    #[test]
    fn sale_deducts_and_return_restores_exactly() {
        let (store, shop, id) = setup("Sugar", dec!(12), Unit::Kg);
        let reconciler = Reconciler::new(store.clone());
        let registry = ItemRegistry::new(store);

        reconciler
            .apply_sale(shop, &[line("Sugar", dec!(5), Some(Unit::Kg))])
            .unwrap();
        assert_eq!(registry.get(id).unwrap().quantity, dec!(7));

        reconciler
            .apply_return(shop, &[line("Sugar", dec!(5), Some(Unit::Kg))])
            .unwrap();
        assert_eq!(registry.get(id).unwrap().quantity, dec!(12));
    }

    #[test]
    fn oversold_quantity_clamps_at_zero() {
        let (store, shop, id) = setup("Sugar", dec!(3), Unit::Kg);
        let reconciler = Reconciler::new(store.clone());

        reconciler
            .apply_sale(shop, &[line("Sugar", dec!(10), None)])
            .unwrap();

        assert_eq!(
            ItemRegistry::new(store).get(id).unwrap().quantity,
            Decimal::ZERO
        );
    }

    #[test]
    fn unmatched_line_is_silently_skipped() {
        let (store, shop, id) = setup("Sugar", dec!(3), Unit::Kg);
        let reconciler = Reconciler::new(store.clone());

        reconciler
            .apply_sale(shop, &[line("Flour", dec!(1), None)])
            .unwrap();

        assert_eq!(ItemRegistry::new(store).get(id).unwrap().quantity, dec!(3));
    }

    #[test]
    fn unit_mismatch_leaves_quantity_unchanged() {
        let (store, shop, id) = setup("Sugar", dec!(3), Unit::Kg);
        let reconciler = Reconciler::new(store.clone());

        reconciler
            .apply_sale(shop, &[line("Sugar", dec!(1), Some(Unit::Units))])
            .unwrap();

        assert_eq!(ItemRegistry::new(store).get(id).unwrap().quantity, dec!(3));
    }

    #[test]
    fn absent_line_unit_matches_any_stored_unit() {
        let (store, shop, id) = setup("Sugar", dec!(3), Unit::Kg);
        let reconciler = Reconciler::new(store.clone());

        reconciler.apply_sale(shop, &[line("Sugar", dec!(1), None)]).unwrap();

        assert_eq!(ItemRegistry::new(store).get(id).unwrap().quantity, dec!(2));
    }

    #[test]
    fn negative_line_quantity_is_rejected() {
        let (store, shop, _id) = setup("Sugar", dec!(3), Unit::Kg);
        let reconciler = Reconciler::new(store);

        let err = reconciler
            .apply_sale(shop, &[line("Sugar", dec!(-1), None)])
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: no sequence of sales and returns drives the stored
        /// quantity negative.
        #[test]
        fn quantity_never_goes_negative(
            initial in 0i64..500,
            ops in prop::collection::vec((any::<bool>(), 1i64..100), 1..30)
        ) {
            let (store, shop, id) = setup("Maize", Decimal::from(initial), Unit::Kg);
            let reconciler = Reconciler::new(store.clone());
            let registry = ItemRegistry::new(store);

            for (is_sale, qty) in ops {
                let lines = [line("Maize", Decimal::from(qty), None)];
                if is_sale {
                    reconciler.apply_sale(shop, &lines).unwrap();
                } else {
                    reconciler.apply_return(shop, &lines).unwrap();
                }
                prop_assert!(registry.get(id).unwrap().quantity >= Decimal::ZERO);
            }
        }

        /// Property: when stock is ample, a sale followed by an equal return
        /// restores the pre-sale quantity exactly.
        #[test]
        fn sale_then_return_round_trips(
            initial in 1000i64..2000,
            qty in 1i64..999
        ) {
            let (store, shop, id) = setup("Maize", Decimal::from(initial), Unit::Kg);
            let reconciler = Reconciler::new(store.clone());
            let registry = ItemRegistry::new(store);

            let lines = [line("Maize", Decimal::from(qty), Some(Unit::Kg))];
            reconciler.apply_sale(shop, &lines).unwrap();
            reconciler.apply_return(shop, &lines).unwrap();

            prop_assert_eq!(registry.get(id).unwrap().quantity, Decimal::from(initial));
        }
    }
}
