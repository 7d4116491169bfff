//! # SQLite backend
//!
//! The "low-level" SQLite interactions are simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or open a transaction and pass
//! `&mut *tx`, without any other changes. [`UnitOfWork`] makes that choice for the settlement steps.
//!
//! Writes with a `RETURNING` clause are read with `fetch_all`. SQLite only finishes the statement once every row has
//! been stepped, so a single-row fetch would leave the write open on the connection.
use std::{env, str::FromStr};

use log::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod carts;
pub mod orders;
pub mod payouts;
pub mod products;
mod sqlite_impl;
pub mod treasury;
mod unit_of_work;

pub use sqlite_impl::SqliteDatabase;
pub use unit_of_work::UnitOfWork;

const SQLITE_DB_URL: &str = "sqlite://data/marketplace.db";

pub fn db_url() -> String {
    let result = env::var("MKT_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ MKT_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
