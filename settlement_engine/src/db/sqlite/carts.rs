use sqlx::SqliteConnection;

pub async fn clear_cart(buyer_id: &str, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE buyer_id = $1").bind(buyer_id).execute(conn).await?;
    Ok(result.rows_affected())
}
