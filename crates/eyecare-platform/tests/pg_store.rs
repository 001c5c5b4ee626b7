//! Postgres store tests. They need a disposable database:
//! `TEST_DATABASE_URL=postgres://... cargo test -p eyecare-platform -- --ignored`

use std::sync::Arc;

use chrono::NaiveDate;
use eyecare_core::{
    ItemCatalog, ItemType, LedgerError, MovementDraft, MovementLedger, MovementType, NewItem,
    StockPolicy,
};
use eyecare_inventory::{StockAdjustment, StockLedger};
use eyecare_platform::{PgStockStore, connect_database, run_migrations};
use rust_decimal::Decimal;
use uuid::Uuid;

async fn store() -> Arc<PgStockStore> {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set to run Postgres store tests");
    let pool = connect_database(&database_url, 8)
        .await
        .expect("failed to connect to test database");
    run_migrations(&pool).await.expect("failed to run migrations");
    Arc::new(PgStockStore::new(pool))
}

fn new_item(opening_stock: i64) -> NewItem {
    NewItem {
        sku: format!("TEST-{}", Uuid::new_v4().simple()),
        name: "Moxifloxacin 0.5% eye drops".to_string(),
        category: "antibiotics".to_string(),
        manufacturer: None,
        description: None,
        purchase_price: Decimal::new(9000, 2),
        selling_price: Decimal::new(12500, 2),
        mrp: Decimal::new(13000, 2),
        gst_percentage: Decimal::new(12, 0),
        reorder_level: 5,
        opening_stock,
        opening_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        user_id: None,
    }
}

fn adjustment(item_id: Uuid, movement_type: MovementType, quantity: i64) -> StockAdjustment {
    StockAdjustment {
        item_type: ItemType::Pharmacy,
        item_id,
        movement_type,
        movement_date: NaiveDate::from_ymd_opt(2026, 5, 2),
        quantity: Decimal::from(quantity),
        unit_price: None,
        reference_number: None,
        supplier: None,
        customer_name: None,
        invoice_id: None,
        notes: None,
        batch_number: None,
        user_id: None,
    }
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn movements_update_catalog_and_ledger_together() {
    let store = store().await;
    let ledger = StockLedger::new(Arc::clone(&store), StockPolicy::default());
    let item = store.create_item(ItemType::Pharmacy, new_item(50)).await.unwrap();

    let outcome = ledger
        .adjust(adjustment(item.id, MovementType::Purchase, 20))
        .await
        .unwrap();
    assert_eq!((outcome.movement.previous_stock, outcome.movement.new_stock), (50, 70));
    assert_eq!(outcome.item.stock_quantity, 70);

    let reconciliation = ledger.reconcile(ItemType::Pharmacy, item.id).await.unwrap();
    assert!(reconciliation.consistent);
    assert_eq!(reconciliation.movement_count, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires TEST_DATABASE_URL"]
async fn concurrent_purchases_are_serialized_by_the_row_lock() {
    let store = store().await;
    let ledger = StockLedger::new(Arc::clone(&store), StockPolicy::default());
    let item = store.create_item(ItemType::Pharmacy, new_item(0)).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let ledger = ledger.clone();
        let request = adjustment(item.id, MovementType::Purchase, 5);
        tasks.push(tokio::spawn(async move { ledger.adjust(request).await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let current = store.get_item(ItemType::Pharmacy, item.id).await.unwrap().unwrap();
    assert_eq!(current.stock_quantity, 50);
    assert!(ledger.reconcile(ItemType::Pharmacy, item.id).await.unwrap().consistent);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn refused_movement_rolls_back() {
    let store = store().await;
    let item = store.create_item(ItemType::Pharmacy, new_item(3)).await.unwrap();
    let strict = StockPolicy {
        allow_negative_stock: false,
    };

    let result = store
        .apply_movement(
            MovementDraft {
                item_type: ItemType::Pharmacy,
                item_id: item.id,
                movement_type: MovementType::Sale,
                movement_date: NaiveDate::from_ymd_opt(2026, 5, 3).unwrap(),
                quantity: 4,
                unit_price: None,
                reference_number: None,
                supplier: None,
                customer_name: None,
                invoice_id: None,
                notes: None,
                batch_number: None,
                user_id: None,
            },
            strict,
        )
        .await;

    assert!(matches!(result, Err(LedgerError::InsufficientStock { .. })));
    let current = store.get_item(ItemType::Pharmacy, item.id).await.unwrap().unwrap();
    assert_eq!(current.stock_quantity, 3);
    assert_eq!(store.ledger(ItemType::Pharmacy, item.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn ledger_rows_cannot_be_edited() {
    let store = store().await;
    let item = store.create_item(ItemType::Pharmacy, new_item(8)).await.unwrap();

    let result = sqlx::query("UPDATE stock_movements SET quantity = 1 WHERE item_id = $1")
        .bind(item.id)
        .execute(store.pool())
        .await;

    assert!(result.is_err());
}
