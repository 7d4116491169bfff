//! The treasury ledger is a single row. Every change is an atomic increment (`SET x = x + $n`), so concurrent
//! settlements never lose updates.
use log::*;
use sqlx::SqliteConnection;

use crate::db_types::{Rupiah, Treasury};

/// Creates the ledger row if it does not exist yet.
pub async fn ensure_exists(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let result = sqlx::query("INSERT INTO treasury (id) VALUES (1) ON CONFLICT (id) DO NOTHING").execute(conn).await?;
    if result.rows_affected() > 0 {
        info!("🗃️ Treasury ledger created");
    }
    Ok(())
}

pub async fn fetch_treasury(conn: &mut SqliteConnection) -> Result<Option<Treasury>, sqlx::Error> {
    let treasury = sqlx::query_as("SELECT * FROM treasury WHERE id = 1").fetch_optional(conn).await?;
    Ok(treasury)
}

/// Credits the ledger with one settled order.
pub async fn credit_settlement(
    seller_amount: Rupiah,
    shipping_cost: Rupiah,
    admin_fee: Rupiah,
    conn: &mut SqliteConnection,
) -> Result<Treasury, sqlx::Error> {
    ensure_exists(&mut *conn).await?;
    let treasury = sqlx::query_as(
        r#"
            UPDATE treasury SET
                admin_fee_balance = admin_fee_balance + $1,
                total_admin_fee_earned = total_admin_fee_earned + $1,
                shipping_balance = shipping_balance + $2,
                total_shipping_collected = total_shipping_collected + $2,
                seller_pending_balance = seller_pending_balance + $3,
                total_orders_processed = total_orders_processed + 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = 1
            RETURNING *;
        "#,
    )
    .bind(admin_fee)
    .bind(shipping_cost)
    .bind(seller_amount)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(treasury)
}

/// Moves a disbursed payout amount out of the seller pending balance.
pub async fn record_seller_payout(amount: Rupiah, conn: &mut SqliteConnection) -> Result<Treasury, sqlx::Error> {
    ensure_exists(&mut *conn).await?;
    let treasury = sqlx::query_as(
        r#"
            UPDATE treasury SET
                seller_pending_balance = seller_pending_balance - $1,
                total_seller_payouts = total_seller_payouts + $1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = 1
            RETURNING *;
        "#,
    )
    .bind(amount)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(treasury)
}
