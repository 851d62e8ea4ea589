//! Tracks staged edits and performs the all-or-nothing commit that publishes
//! them.

use sqlx::{Sqlite, Transaction};
use thiserror::Error;
use tracing::info;

use crate::db::record_repo::{self, Record};
use crate::db::zone_repo::{self, Zone};
use crate::db::Db;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("store access failed: {0}")]
    Store(#[from] sqlx::Error),

    #[error("commit touched {actual} rows but {expected} were staged; rolled back")]
    CommitMismatch { expected: u64, actual: u64 },
}

/// The sole writer allowed to clear `staging` flags.
#[derive(Clone)]
pub struct StagingCoordinator {
    db: Db,
}

impl StagingCoordinator {
    pub fn new(db: Db) -> Self {
        StagingCoordinator { db }
    }

    /// Every zone and record currently carrying an uncommitted edit.
    pub async fn get_staged(&self) -> Result<(Vec<Zone>, Vec<Record>), StagingError> {
        let zones = zone_repo::staged(&self.db).await?;
        let records = record_repo::staged(&self.db).await?;
        Ok((zones, records))
    }

    /// Flip every staged row to published, atomically. Returns the number of
    /// rows cleared; zero staged rows is a no-op, not an error.
    ///
    /// The pre-count check detects a race with a concurrent edit: if the bulk
    /// update touches a different number of rows than were staged when the
    /// transaction began, the whole commit rolls back and the rows stay
    /// staged for retry.
    pub async fn commit_all(&self) -> Result<u64, StagingError> {
        let mut tx = self.db.begin().await?;

        let (staged_zones,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM zones WHERE staging = 1")
                .fetch_one(&mut *tx)
                .await?;
        let (staged_records,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM records WHERE staging = 1")
                .fetch_one(&mut *tx)
                .await?;
        let expected = (staged_zones + staged_records) as u64;

        if expected == 0 {
            return Ok(0);
        }

        Self::clear_staged(tx, expected).await
    }

    /// Clear every staged row, committing the transaction only if the number
    /// of rows touched matches `expected`. On a mismatch the transaction is
    /// dropped, which rolls it back and leaves every row staged.
    async fn clear_staged(
        mut tx: Transaction<'_, Sqlite>,
        expected: u64,
    ) -> Result<u64, StagingError> {
        let zones_cleared = sqlx::query("UPDATE zones SET staging = 0 WHERE staging = 1")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let records_cleared = sqlx::query("UPDATE records SET staging = 0 WHERE staging = 1")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let actual = zones_cleared + records_cleared;
        if actual != expected {
            return Err(StagingError::CommitMismatch { expected, actual });
        }

        tx.commit().await?;
        info!(rows = actual, "staged rows committed");
        Ok(actual)
    }
}
