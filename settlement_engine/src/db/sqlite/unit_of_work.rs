use log::*;
use sqlx::{pool::PoolConnection, Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::db_types::SettlementMode;

/// A sequence of statements that runs either inside a transaction or directly on a pooled connection.
///
/// The low-level query functions all take `&mut SqliteConnection`, so the same step code runs unchanged in both modes.
/// Dropping an `Atomic` unit of work without calling [`UnitOfWork::commit`] rolls it back.
pub enum UnitOfWork {
    Atomic(Transaction<'static, Sqlite>),
    Sequential(PoolConnection<Sqlite>),
}

impl UnitOfWork {
    pub async fn begin(pool: &SqlitePool, mode: SettlementMode) -> Result<Self, sqlx::Error> {
        match mode {
            SettlementMode::Atomic => Ok(Self::Atomic(pool.begin().await?)),
            SettlementMode::Sequential => Ok(Self::Sequential(pool.acquire().await?)),
        }
    }

    pub fn mode(&self) -> SettlementMode {
        match self {
            Self::Atomic(_) => SettlementMode::Atomic,
            Self::Sequential(_) => SettlementMode::Sequential,
        }
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        match self {
            Self::Atomic(tx) => &mut **tx,
            Self::Sequential(conn) => &mut **conn,
        }
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        match self {
            Self::Atomic(tx) => tx.commit().await,
            Self::Sequential(_) => Ok(()),
        }
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        match self {
            Self::Atomic(tx) => tx.rollback().await,
            Self::Sequential(_) => {
                warn!("🗃️ Rollback requested on a sequential unit of work. Completed statements remain in effect.");
                Ok(())
            },
        }
    }
}

/// Checks that the database accepts `BEGIN`/`ROLLBACK`. Returns the mode to use, downgrading to `Sequential` if
/// transactions are unavailable.
pub async fn detect_mode(pool: &SqlitePool, requested: SettlementMode) -> SettlementMode {
    if requested == SettlementMode::Sequential {
        warn!(
            "🗃️ Settlements are configured to run sequentially. A failure part-way through a settlement will leave \
             partial effects that must be reconciled by hand."
        );
        return requested;
    }
    let check = async {
        let mut tx = pool.begin().await?;
        sqlx::query("SELECT 1").execute(&mut *tx).await?;
        tx.rollback().await?;
        Ok::<(), sqlx::Error>(())
    };
    match check.await {
        Ok(()) => {
            debug!("🗃️ Transaction support confirmed. Settlements will run atomically.");
            SettlementMode::Atomic
        },
        Err(e) => {
            warn!(
                "🗃️ The database does not support transactions ({e}). Settlements will run SEQUENTIALLY, without \
                 atomicity. A failure part-way through a settlement will leave partial effects that must be \
                 reconciled by hand."
            );
            SettlementMode::Sequential
        },
    }
}
