use actix_web::{http::StatusCode, test::TestRequest};
use settlement_engine::{
    events::EventProducers,
    test_utils::{drop_test_database, fixtures::*},
    SettlementApi,
    SqliteDatabase,
};

use super::{helpers::*, mocks::MockPaymentProvider};

async fn settled_database() -> SqliteDatabase {
    let db = seeded_database().await;
    let api = SettlementApi::new(db.clone(), EventProducers::default());
    let store = place_order(&db, store_order("order-t1", "PAY-T1")).await;
    let platform = place_order(&db, platform_order("order-t2", "PAY-T2")).await;
    api.settle(&store).await.expect("Settlement failed");
    api.settle(&platform).await.expect("Settlement failed");
    db
}

#[actix_web::test]
async fn treasury_needs_an_admin() {
    let db = settled_database().await;
    let req = || TestRequest::get().uri("/admin/treasury");
    let (status, _) = send(&db, MockPaymentProvider::new(), req()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&db, MockPaymentProvider::new(), as_seller(req())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, res) = send(&db, MockPaymentProvider::new(), as_admin(req())).await;
    assert_eq!(status, StatusCode::OK);
    let treasury = json(&res);
    assert_eq!(treasury["total_orders_processed"], 2);
    assert_eq!(treasury["seller_pending_balance"], 160_000);
    assert_eq!(treasury["shipping_balance"], 30_000);
    assert_eq!(treasury["admin_fee_balance"], 10_000);
    drop_test_database(db).await;
}

#[actix_web::test]
async fn payouts_can_be_listed_and_completed() {
    let db = settled_database().await;
    let req = TestRequest::get().uri("/admin/payouts?store_id=store-1");
    let (status, res) = send(&db, MockPaymentProvider::new(), as_admin(req)).await;
    assert_eq!(status, StatusCode::OK);
    let payouts = json(&res);
    let payouts = payouts.as_array().unwrap();
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0]["status"], "pending");
    assert_eq!(payouts[0]["amount"], 80_000);
    let id = payouts[0]["id"].as_i64().unwrap();

    let req = TestRequest::get().uri(&format!("/admin/payouts/{id}"));
    let (status, res) = send(&db, MockPaymentProvider::new(), as_admin(req)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&res)["order_id"], "order-t1");

    let complete = || TestRequest::post().uri(&format!("/admin/payouts/{id}/complete"));
    let (status, res) = send(&db, MockPaymentProvider::new(), as_admin(complete())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&res)["status"], "completed");
    let (status, _) = send(&db, MockPaymentProvider::new(), as_admin(complete())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::get().uri("/admin/treasury");
    let (_, res) = send(&db, MockPaymentProvider::new(), as_admin(req)).await;
    let treasury = json(&res);
    assert_eq!(treasury["seller_pending_balance"], 80_000);
    assert_eq!(treasury["total_seller_payouts"], 80_000);
    drop_test_database(db).await;
}

#[actix_web::test]
async fn failed_and_missing_payouts() {
    let db = settled_database().await;
    let req = TestRequest::get().uri("/admin/payouts");
    let (_, res) = send(&db, MockPaymentProvider::new(), as_admin(req)).await;
    let id = json(&res)[0]["id"].as_i64().unwrap();

    let req = TestRequest::post().uri(&format!("/admin/payouts/{id}/fail"));
    let (status, res) = send(&db, MockPaymentProvider::new(), as_admin(req)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&res)["status"], "failed");

    let req = TestRequest::post().uri("/admin/payouts/999/complete");
    let (status, _) = send(&db, MockPaymentProvider::new(), as_admin(req)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let req = TestRequest::get().uri("/admin/payouts/999");
    let (status, _) = send(&db, MockPaymentProvider::new(), as_admin(req)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    drop_test_database(db).await;
}
