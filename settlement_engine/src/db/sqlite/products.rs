use log::*;
use sqlx::SqliteConnection;

use crate::db_types::{NewProduct, Product};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as(
        "INSERT INTO products (id, store_id, name, price, stock) VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(product.id)
    .bind(product.store_id)
    .bind(product.name)
    .bind(product.price)
    .bind(product.stock)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(product)
}

pub async fn fetch_product(product_id: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

/// Reduces stock by `quantity` in a single statement, clamping at zero. Returns the new stock level, or `None` if the
/// product does not exist.
pub async fn decrement_stock(
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, sqlx::Error> {
    let stock: Option<(i64,)> = sqlx::query_as(
        r#"
            UPDATE products SET stock = MAX(0, stock - $1), updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING stock;
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_all(conn)
    .await?
    .pop();
    trace!("🗃️ Stock for {product_id} reduced by {quantity}. Now {stock:?}");
    Ok(stock.map(|(s,)| s))
}
