//! A small produce catalogue and order builders shared by the integration tests and the cucumber suite.
use crate::{
    db_types::{NewOrder, NewOrderItem, NewProduct, Order, OrderId, Rupiah},
    traits::{CatalogManagement, OrderManagement},
    SqliteDatabase,
};

pub const STORE_1: &str = "store-1";
pub const STORE_2: &str = "store-2";
pub const BUYER_1: &str = "buyer-1";
pub const BUYER_2: &str = "buyer-2";

/// `(id, store, name, price, stock)`
pub const PRODUCTS: [(&str, Option<&str>, &str, i64, i64); 4] = [
    ("tomato", Some(STORE_1), "Tomato (1kg)", 20_000, 50),
    ("chili", Some(STORE_1), "Red chili (250g)", 12_500, 10),
    ("shallot", Some(STORE_2), "Shallot (500g)", 18_000, 1),
    ("rice", None, "Rice (5kg)", 75_000, 100),
];

pub async fn seed_products(db: &SqliteDatabase) {
    for (id, store, name, price, stock) in PRODUCTS {
        let mut product = NewProduct::new(id, name, Rupiah::from(price), stock);
        if let Some(store) = store {
            product = product.with_store(store);
        }
        db.insert_product(product).await.expect("Error seeding product");
    }
}

pub async fn stock_of(db: &SqliteDatabase, product_id: &str) -> i64 {
    db.fetch_product(product_id).await.expect("Error fetching product").map(|p| p.stock).unwrap_or(-1)
}

pub async fn add_to_cart(db: &SqliteDatabase, buyer_id: &str, product_id: &str, quantity: i64) {
    sqlx::query("INSERT INTO cart_items (buyer_id, product_id, quantity) VALUES ($1, $2, $3)")
        .bind(buyer_id)
        .bind(product_id)
        .bind(quantity)
        .execute(db.pool())
        .await
        .expect("Error adding to cart");
}

pub async fn cart_size(db: &SqliteDatabase, buyer_id: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE buyer_id = $1")
        .bind(buyer_id)
        .fetch_one(db.pool())
        .await
        .expect("Error counting cart items");
    count
}

pub fn item(product_id: &str, price: i64, quantity: i64) -> NewOrderItem {
    NewOrderItem::new(product_id, product_id, Rupiah::from(price), quantity)
}

/// 3 × tomato and 2 × chili from store 1, with seller earnings of Rp80.000, shipping of Rp15.000 and an admin fee of
/// Rp5.000.
pub fn store_order(order_id: &str, payment_id: &str) -> NewOrder {
    NewOrder::new(OrderId::from(order_id), BUYER_1)
        .with_store(STORE_1)
        .with_payment_id(payment_id)
        .with_item(item("tomato", 20_000, 3))
        .with_item(item("chili", 12_500, 2))
        .with_seller_earnings(Rupiah::from(80_000))
        .with_shipping_cost(Rupiah::from(15_000))
        .with_admin_fee(Rupiah::from(5_000))
}

/// An order for platform-sold rice, with the same money split as [`store_order`].
pub fn platform_order(order_id: &str, payment_id: &str) -> NewOrder {
    NewOrder::new(OrderId::from(order_id), BUYER_1)
        .with_payment_id(payment_id)
        .with_item(item("rice", 75_000, 1))
        .with_seller_earnings(Rupiah::from(80_000))
        .with_shipping_cost(Rupiah::from(15_000))
        .with_admin_fee(Rupiah::from(5_000))
}

pub async fn place_order(db: &SqliteDatabase, order: NewOrder) -> Order {
    db.insert_order(order).await.expect("Error inserting order").into_order()
}
