use log::*;
use settlement_engine::{
    db_types::{PayoutStatus, Rupiah, SettlementMode},
    engine_api::errors::TreasuryError,
    events::EventProducers,
    test_utils::{fixtures::*, test_database},
    SettlementApi,
    SqliteDatabase,
    TreasuryApi,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

async fn setup() -> (TreasuryApi<SqliteDatabase>, SqliteDatabase) {
    let db = test_database(SettlementMode::Atomic).await;
    seed_products(&db).await;
    let settlement = SettlementApi::new(db.clone(), EventProducers::default());
    for (order_id, payment_id) in [("order-t1", "PAY-T1"), ("order-t2", "PAY-T2")] {
        let order = place_order(&db, store_order(order_id, payment_id)).await;
        settlement.settle(&order).await.expect("Settlement failed");
    }
    let order = place_order(&db, platform_order("order-t3", "PAY-T3")).await;
    settlement.settle(&order).await.expect("Settlement failed");
    (TreasuryApi::new(db.clone()), db)
}

async fn tear_down(mut db: SqliteDatabase) {
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    let _ = Sqlite::drop_database(db.url()).await;
}

#[tokio::test]
async fn fresh_treasury_is_empty() {
    let db = test_database(SettlementMode::Atomic).await;
    let api = TreasuryApi::new(db.clone());
    let treasury = api.treasury().await.unwrap();
    assert_eq!(treasury.total_orders_processed, 0);
    assert_eq!(treasury.seller_pending_balance, Rupiah::from(0));
    assert!(api.payouts(None).await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn ledger_accumulates_settlements() {
    let (api, db) = setup().await;
    let treasury = api.treasury().await.unwrap();
    assert_eq!(treasury.total_orders_processed, 3);
    assert_eq!(treasury.seller_pending_balance, Rupiah::from(240_000));
    assert_eq!(treasury.shipping_balance, Rupiah::from(45_000));
    assert_eq!(treasury.admin_fee_balance, Rupiah::from(15_000));
    assert_eq!(treasury.total_seller_payouts, Rupiah::from(0));
    let payouts = api.payouts(Some(STORE_1)).await.unwrap();
    assert_eq!(payouts.len(), 2);
    assert!(api.payouts(Some(STORE_2)).await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn completing_a_payout_releases_the_pending_balance() {
    let (api, db) = setup().await;
    let payouts = api.payouts(None).await.unwrap();
    let id = payouts[0].id;
    let payout = api.complete_payout(id).await.unwrap();
    assert_eq!(payout.status, PayoutStatus::Completed);
    assert!(payout.processed_at.is_some());

    let treasury = api.treasury().await.unwrap();
    assert_eq!(treasury.seller_pending_balance, Rupiah::from(160_000));
    assert_eq!(treasury.total_seller_payouts, Rupiah::from(80_000));
    // Other balances are untouched
    assert_eq!(treasury.admin_fee_balance, Rupiah::from(15_000));

    let err = api.complete_payout(id).await.unwrap_err();
    assert!(matches!(err, TreasuryError::InvalidPayoutTransition { from: PayoutStatus::Completed, .. }));
    let err = api.fail_payout(id).await.unwrap_err();
    assert!(matches!(err, TreasuryError::InvalidPayoutTransition { .. }));
    assert_eq!(api.treasury().await.unwrap().total_seller_payouts, Rupiah::from(80_000));
    tear_down(db).await;
}

#[tokio::test]
async fn failing_a_payout_has_no_ledger_effect() {
    let (api, db) = setup().await;
    let id = api.payouts(None).await.unwrap()[1].id;
    let payout = api.fail_payout(id).await.unwrap();
    assert_eq!(payout.status, PayoutStatus::Failed);
    let treasury = api.treasury().await.unwrap();
    assert_eq!(treasury.seller_pending_balance, Rupiah::from(240_000));
    assert_eq!(treasury.total_seller_payouts, Rupiah::from(0));
    let err = api.complete_payout(id).await.unwrap_err();
    assert!(matches!(err, TreasuryError::InvalidPayoutTransition { from: PayoutStatus::Failed, .. }));
    tear_down(db).await;
}

#[tokio::test]
async fn unknown_payouts_are_not_found() {
    let (api, db) = setup().await;
    assert!(matches!(api.payout(999).await.unwrap_err(), TreasuryError::PayoutNotFound(999)));
    assert!(matches!(api.complete_payout(999).await.unwrap_err(), TreasuryError::PayoutNotFound(999)));
    tear_down(db).await;
}
