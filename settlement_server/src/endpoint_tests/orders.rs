use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json as body;
use settlement_engine::{
    db_types::Order,
    events::EventProducers,
    test_utils::{drop_test_database, fixtures::*},
    SettlementApi,
    SqliteDatabase,
};

use super::{helpers::*, mocks::MockPaymentProvider};

async fn paid_order(db: &SqliteDatabase, order_id: &str) -> Order {
    let order = place_order(db, store_order(order_id, &format!("PAY-{order_id}"))).await;
    let api = SettlementApi::new(db.clone(), EventProducers::default());
    api.settle(&order).await.expect("Settlement failed").order().clone()
}

fn status_update(order_id: &str, status: &str) -> TestRequest {
    TestRequest::patch().uri(&format!("/orders/{order_id}/status")).set_json(body!({ "status": status }))
}

#[actix_web::test]
async fn buyers_and_sellers_see_their_orders() {
    let db = seeded_database().await;
    paid_order(&db, "order-v1").await;
    let req = || TestRequest::get().uri("/orders/order-v1");

    let (status, res) = send(&db, MockPaymentProvider::new(), as_buyer(req())).await;
    assert_eq!(status, StatusCode::OK);
    let order = json(&res);
    assert_eq!(order["order_id"], "order-v1");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["tracking_history"].as_array().unwrap().len(), 2);

    let (status, _) = send(&db, MockPaymentProvider::new(), as_seller(req())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&db, MockPaymentProvider::new(), as_admin(req())).await;
    assert_eq!(status, StatusCode::OK);

    let stranger = with_principal(req(), "seller-2", "seller", Some(STORE_2));
    let (status, _) = send(&db, MockPaymentProvider::new(), stranger).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&db, MockPaymentProvider::new(), req()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    drop_test_database(db).await;
}

#[actix_web::test]
async fn unpaid_orders_are_hidden_from_buyers() {
    let db = seeded_database().await;
    place_order(&db, store_order("order-v2", "PAY-V2")).await;
    let req = || TestRequest::get().uri("/orders/order-v2");
    let (status, _) = send(&db, MockPaymentProvider::new(), as_buyer(req())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, res) = send(&db, MockPaymentProvider::new(), as_admin(req())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&res)["status"], "awaiting_payment");
    drop_test_database(db).await;
}

#[actix_web::test]
async fn seller_ships_and_buyer_confirms() {
    let db = seeded_database().await;
    paid_order(&db, "order-s1").await;
    let (status, res) = send(&db, MockPaymentProvider::new(), as_seller(status_update("order-s1", "shipped"))).await;
    assert_eq!(status, StatusCode::OK);
    let order = json(&res);
    assert_eq!(order["status"], "shipped");
    assert!(order["shipped_at"].is_string());

    let (status, res) = send(&db, MockPaymentProvider::new(), as_buyer(status_update("order-s1", "delivered"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&res)["status"], "delivered");
    drop_test_database(db).await;
}

#[actix_web::test]
async fn status_updates_are_role_gated() {
    let db = seeded_database().await;
    paid_order(&db, "order-s2").await;
    // Buyers cannot ship
    let (status, _) = send(&db, MockPaymentProvider::new(), as_buyer(status_update("order-s2", "shipped"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    // Unknown statuses
    let (status, _) = send(&db, MockPaymentProvider::new(), as_admin(status_update("order-s2", "lost"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    // Pending orders cannot be delivered
    let (status, res) = send(&db, MockPaymentProvider::new(), as_seller(status_update("order-s2", "delivered"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&res)["error"].as_str().unwrap().contains("cannot move from pending to delivered"));
    // Other stores' sellers
    let stranger = with_principal(status_update("order-s2", "shipped"), "seller-2", "seller", Some(STORE_2));
    let (status, _) = send(&db, MockPaymentProvider::new(), stranger).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    // Missing orders
    let (status, _) = send(&db, MockPaymentProvider::new(), as_admin(status_update("order-none", "canceled"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    // No principal at all
    let (status, _) = send(&db, MockPaymentProvider::new(), status_update("order-s2", "shipped")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    drop_test_database(db).await;
}
