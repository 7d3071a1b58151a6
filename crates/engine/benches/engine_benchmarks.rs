use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use rust_decimal::Decimal;
use std::sync::Arc;

use tillpoint_core::{ShopId, TransactionId, Unit};
use tillpoint_engine::PosEngine;
use tillpoint_inventory::{NewStockItem, SaleLine};
use tillpoint_store::InMemoryStore;

fn fresh_engine() -> (PosEngine<Arc<InMemoryStore>>, ShopId) {
    let engine = PosEngine::new(Arc::new(InMemoryStore::new()));
    (engine, ShopId::new())
}

fn stock_item(name: &str, quantity: i64) -> NewStockItem {
    NewStockItem {
        name: name.to_string(),
        category: None,
        description: None,
        price: Decimal::new(150, 2),
        cost_price: None,
        quantity: Decimal::from(quantity),
        unit: Unit::Units,
        sku: None,
        low_stock_threshold: None,
        expiry_date: None,
    }
}

fn bench_item_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("item_creation");
    group.throughput(Throughput::Elements(1));

    group.bench_function("create_item", |b| {
        let (engine, shop) = fresh_engine();
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            engine
                .create_item(shop, stock_item(&format!("Item {n}"), 100))
                .unwrap();
        });
    });

    group.finish();
}

fn bench_sale_reconciliation(c: &mut Criterion) {
    let mut group = c.benchmark_group("sale_reconciliation");

    // Name matching scans the shop's items, so catalog size is the variable
    // that matters.
    for catalog_size in [10usize, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("apply_sale", catalog_size),
            &catalog_size,
            |b, &size| {
                let (engine, shop) = fresh_engine();
                for n in 0..size {
                    engine
                        .create_item(shop, stock_item(&format!("Item {n}"), i64::MAX / 2))
                        .unwrap();
                }
                let lines = [SaleLine {
                    name: format!("Item {}", size - 1),
                    quantity: Decimal::ONE,
                    unit: None,
                }];
                b.iter(|| engine.apply_sale(shop, black_box(&lines)).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_payment_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("payment_allocation");
    group.sample_size(200);

    group.bench_function("allocate_across_outstanding_entries", |b| {
        let (engine, shop) = fresh_engine();
        for _ in 0..50 {
            engine
                .record_loan(shop, "Asha", TransactionId::new(), Decimal::from(1_000_000))
                .unwrap();
        }
        b.iter(|| {
            engine
                .allocate_payment(shop, "Asha", black_box(Decimal::ONE))
                .unwrap()
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_item_creation,
    bench_sale_reconciliation,
    bench_payment_allocation
);
criterion_main!(benches);
