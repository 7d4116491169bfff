use log::*;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{NewOrder, NewTrackingEntry, Order, OrderId, OrderItem, OrderStatusType, Rupiah, TrackingEntry},
    engine_api::errors::SettlementError,
    traits::InsertOrderResult,
};

/// Inserts the order, its line items and the initial tracking entry. If the order already exists, the stored order is
/// returned and nothing else is written.
///
/// This is not atomic. Embed the call inside a transaction and pass `&mut *tx` as the connection argument.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, SettlementError> {
    let order_id = order.order_id.clone();
    let total_price = order.total_price().ok_or_else(|| SettlementError::InvalidOrder {
        order_id: order_id.clone(),
        reason: "Its amounts are too large to be represented.".to_string(),
    })?;
    match insert_order(&order, total_price, conn).await {
        Ok(inserted) => {
            for item in &order.items {
                sqlx::query(
                    r#"INSERT INTO order_items (order_id, product_id, name, price, quantity, image)
                    VALUES ($1, $2, $3, $4, $5, $6)"#,
                )
                .bind(order_id.as_str())
                .bind(&item.product_id)
                .bind(&item.name)
                .bind(item.price)
                .bind(item.quantity)
                .bind(&item.image)
                .execute(&mut *conn)
                .await?;
            }
            let entry = NewTrackingEntry::new(
                inserted.status,
                "Order placed",
                "The order has been placed and is waiting for payment.",
            );
            append_tracking_entry(&order_id, entry, conn).await?;
            debug!("🗃️ Order [{order_id}] inserted with id {} and {} items", inserted.id, order.items.len());
            Ok(InsertOrderResult::Inserted(inserted))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            debug!("🗃️ Order [{order_id}] already exists");
            let existing =
                fetch_order_by_order_id(&order_id, conn).await?.ok_or(SettlementError::OrderNotFound(order_id))?;
            Ok(InsertOrderResult::AlreadyExists(existing))
        },
        Err(e) => Err(e.into()),
    }
}

async fn insert_order(
    order: &NewOrder,
    total_price: Rupiah,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                buyer_id,
                store_id,
                shipping_address,
                payment_id,
                total_price,
                seller_earnings,
                shipping_cost,
                admin_fee
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.buyer_id)
    .bind(&order.store_id)
    .bind(Json(&order.shipping_address))
    .bind(&order.payment_id)
    .bind(total_price)
    .bind(order.seller_earnings)
    .bind(order.shipping_cost)
    .bind(order.admin_fee)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_by_payment_id(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE payment_id = $1 ORDER BY id ASC")
        .bind(payment_id)
        .fetch_all(conn)
        .await?;
    trace!("🗃️ {} orders found for payment {payment_id}", orders.len());
    Ok(orders)
}

pub async fn fetch_order_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_tracking_history(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<TrackingEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM order_tracking WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

pub async fn append_tracking_entry(
    order_id: &OrderId,
    entry: NewTrackingEntry,
    conn: &mut SqliteConnection,
) -> Result<TrackingEntry, sqlx::Error> {
    let entry = sqlx::query_as(
        "INSERT INTO order_tracking (order_id, status, title, description) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(order_id.as_str())
    .bind(entry.status)
    .bind(entry.title)
    .bind(entry.description)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(entry)
}

/// The settlement gate. Flips `is_paid` and records the settled payment status, but only if the order is still unpaid.
/// An order that was hidden while awaiting payment becomes `pending`, so the seller can see it.
///
/// Returns `None` if the order was already paid.
pub async fn mark_paid(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                is_paid = 1,
                paid_at = CURRENT_TIMESTAMP,
                payment_status = 'settlement',
                payment_updated_at = CURRENT_TIMESTAMP,
                status = CASE WHEN status = 'awaiting_payment' THEN 'pending' ELSE status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND is_paid = 0
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_all(conn)
    .await?
    .pop();
    Ok(order)
}

pub async fn update_payment_status(
    order_id: &OrderId,
    status: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                payment_status = $1,
                payment_updated_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2 AND is_paid = 0
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(order_id.as_str())
    .fetch_all(conn)
    .await?
    .pop();
    Ok(order)
}

/// Conditionally moves the order from `from` to `to`. Returns `None` if the order is not in `from` status.
/// `shipped_at` and `delivered_at` are only ever set once.
pub async fn update_status(
    order_id: &OrderId,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                shipped_at = CASE WHEN $1 = 'shipped' THEN COALESCE(shipped_at, CURRENT_TIMESTAMP) ELSE shipped_at END,
                delivered_at = CASE WHEN $1 = 'delivered' THEN COALESCE(delivered_at, CURRENT_TIMESTAMP) ELSE delivered_at END,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(order_id.as_str())
    .bind(from)
    .fetch_all(conn)
    .await?
    .pop();
    Ok(order)
}
