//! Caller-controlled transaction scope shared by the stores
//!
//! Writes go into one transaction that is opened by the first write and stays open
//! until `commit`. Reads issued meanwhile run on that same transaction, so they see
//! the pending writes. `close` discards anything uncommitted.

use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::store_error::StoreResult;

pub type PendingTransaction = Option<Transaction<'static, Sqlite>>;

pub struct StoreSession {
    pool: SqlitePool,
    pending: Mutex<PendingTransaction>,
}

impl StoreSession {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            pending: Mutex::new(None),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Current transaction slot, for reads. `None` means nothing is pending and the
    /// pool can be queried directly.
    pub async fn reader(&self) -> MutexGuard<'_, PendingTransaction> {
        self.pending.lock().await
    }

    /// The open transaction, beginning one if needed
    pub async fn writer(&self) -> StoreResult<MappedMutexGuard<'_, Transaction<'static, Sqlite>>> {
        let mut guard = self.pending.lock().await;
        let tx = match guard.take() {
            Some(tx) => tx,
            None => {
                debug!("Opening write transaction");
                self.pool.begin().await?
            }
        };
        Ok(MutexGuard::map(guard, |slot| slot.insert(tx)))
    }

    /// Commit pending writes. A no-op when nothing was written.
    pub async fn commit(&self) -> StoreResult<()> {
        if let Some(tx) = self.pending.lock().await.take() {
            tx.commit().await?;
            debug!("Committed write transaction");
        }
        Ok(())
    }

    /// Roll back anything uncommitted and close the pool
    pub async fn close(&self) -> StoreResult<()> {
        if let Some(tx) = self.pending.lock().await.take() {
            warn!("Closing store with uncommitted writes; rolling them back");
            tx.rollback().await?;
        }
        self.pool.close().await;
        Ok(())
    }
}
