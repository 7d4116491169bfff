use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayout, OrderId, Payout, PayoutStatus, PayoutType},
    engine_api::errors::SettlementError,
    traits::InsertPayoutResult,
};

/// Inserts the payout. A second order payment for the same order violates the partial unique index on
/// `(order_id, payout_type)`, in which case the existing payout is returned instead.
pub async fn idempotent_insert(
    payout: NewPayout,
    conn: &mut SqliteConnection,
) -> Result<InsertPayoutResult, SettlementError> {
    let order_id = payout.order_id.clone();
    let result = sqlx::query_as::<_, Payout>(
        r#"
            INSERT INTO payouts (store_id, order_id, amount, payout_type, product_total, shipping_cost, admin_fee, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(payout.store_id)
    .bind(payout.order_id)
    .bind(payout.amount)
    .bind(payout.payout_type)
    .bind(payout.breakdown.product_total)
    .bind(payout.breakdown.shipping_cost)
    .bind(payout.breakdown.admin_fee)
    .bind(payout.notes)
    .fetch_all(&mut *conn)
    .await
    .and_then(|rows| rows.into_iter().next().ok_or(sqlx::Error::RowNotFound));
    match (result, order_id) {
        (Ok(payout), _) => {
            debug!("🗃️ Payout #{} of {} created for store {}", payout.id, payout.amount, payout.store_id);
            Ok(InsertPayoutResult::Inserted(payout))
        },
        (Err(sqlx::Error::Database(e)), Some(order_id)) if e.is_unique_violation() => {
            debug!("🗃️ Order {order_id} already has an order payment payout");
            let existing = fetch_payout_for_order(&order_id, conn)
                .await?
                .ok_or_else(|| SettlementError::DatabaseError(format!("Payout for {order_id} vanished")))?;
            Ok(InsertPayoutResult::AlreadyExists(existing))
        },
        (Err(e), _) => Err(e.into()),
    }
}

pub async fn fetch_payout(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payout>, sqlx::Error> {
    let payout = sqlx::query_as("SELECT * FROM payouts WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(payout)
}

pub async fn fetch_payout_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payout>, sqlx::Error> {
    let payout = sqlx::query_as("SELECT * FROM payouts WHERE order_id = $1 AND payout_type = $2")
        .bind(order_id.as_str())
        .bind(PayoutType::OrderPayment)
        .fetch_optional(conn)
        .await?;
    Ok(payout)
}

pub async fn fetch_payouts(store_id: Option<&str>, conn: &mut SqliteConnection) -> Result<Vec<Payout>, sqlx::Error> {
    let payouts = match store_id {
        Some(store_id) => {
            sqlx::query_as("SELECT * FROM payouts WHERE store_id = $1 ORDER BY id DESC")
                .bind(store_id)
                .fetch_all(conn)
                .await?
        },
        None => sqlx::query_as("SELECT * FROM payouts ORDER BY id DESC").fetch_all(conn).await?,
    };
    Ok(payouts)
}

/// Moves a pending payout to `status`. Returns `None` if the payout does not exist or is no longer pending.
pub async fn close_payout(
    id: i64,
    status: PayoutStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Payout>, sqlx::Error> {
    let payout = sqlx::query_as(
        r#"
            UPDATE payouts SET status = $1, processed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(id)
    .fetch_all(conn)
    .await?
    .pop();
    Ok(payout)
}
