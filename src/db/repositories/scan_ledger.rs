//! Scan ledger repository
//!
//! One row per (user, calendar day) counting identification scans. The
//! increment is conditional and atomic at the database layer: the guard
//! against the daily cap lives inside a single upsert statement, so two
//! concurrent scans can never both consume the last remaining slot. The
//! `UNIQUE (user_id, scan_date)` index is what makes the upsert possible.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Scan ledger repository trait
#[async_trait]
pub trait ScanLedgerRepository: Send + Sync {
    /// Atomically increment the user's scan count for `date`, but only if the
    /// current count is below `limit`.
    ///
    /// Returns `Some(new_count)` when the increment was applied and `None`
    /// when the count already reached the limit. Rows are created on first
    /// use with a count of 1.
    async fn increment_if_below(
        &self,
        user_id: i64,
        date: NaiveDate,
        limit: i64,
    ) -> Result<Option<i64>>;

    /// Current count for a (user, day) pair; 0 when no row exists yet
    async fn count_for_day(&self, user_id: i64, date: NaiveDate) -> Result<i64>;
}

/// SQLx-based scan ledger repository implementation
pub struct SqlxScanLedgerRepository {
    pool: DynDatabasePool,
}

impl SqlxScanLedgerRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ScanLedgerRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ScanLedgerRepository for SqlxScanLedgerRepository {
    async fn increment_if_below(
        &self,
        user_id: i64,
        date: NaiveDate,
        limit: i64,
    ) -> Result<Option<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                increment_sqlite(self.pool.as_sqlite().unwrap(), user_id, date, limit).await
            }
            DatabaseDriver::Mysql => {
                increment_mysql(self.pool.as_mysql().unwrap(), user_id, date, limit).await
            }
        }
    }

    async fn count_for_day(&self, user_id: i64, date: NaiveDate) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_sqlite(self.pool.as_sqlite().unwrap(), user_id, date).await
            }
            DatabaseDriver::Mysql => {
                count_mysql(self.pool.as_mysql().unwrap(), user_id, date).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

/// SQLite upsert with a guarded `DO UPDATE`. When the guard fails the
/// statement touches no row and `RETURNING` yields nothing, which maps
/// directly onto the `None` (limit reached) case.
async fn increment_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    date: NaiveDate,
    limit: i64,
) -> Result<Option<i64>> {
    let row = sqlx::query(
        r#"
        INSERT INTO scan_ledger (user_id, scan_date, count, updated_at)
        VALUES (?, ?, 1, ?)
        ON CONFLICT (user_id, scan_date) DO UPDATE
            SET count = count + 1, updated_at = excluded.updated_at
            WHERE scan_ledger.count < ?
        RETURNING count
        "#,
    )
    .bind(user_id)
    .bind(date)
    .bind(Utc::now())
    .bind(limit)
    .fetch_optional(pool)
    .await
    .context("Failed to increment scan ledger")?;

    Ok(row.map(|row| row.get::<i64, _>("count")))
}

async fn count_sqlite(pool: &SqlitePool, user_id: i64, date: NaiveDate) -> Result<i64> {
    let row = sqlx::query("SELECT count FROM scan_ledger WHERE user_id = ? AND scan_date = ?")
        .bind(user_id)
        .bind(date)
        .fetch_optional(pool)
        .await
        .context("Failed to read scan ledger")?;

    Ok(row.map(|row| row.get::<i64, _>("count")).unwrap_or(0))
}

// ============================================================================
// MySQL implementations
// ============================================================================

/// What a guarded UPDATE that matched no row actually means, given the
/// count read immediately after it.
#[derive(Debug, PartialEq)]
enum MissedUpdate {
    /// Today's row exists and is at the cap.
    LimitReached,
    /// Today's row exists below the cap. Another request created it after
    /// the UPDATE ran; the UPDATE must be retried, not denied.
    RetryUpdate,
    /// No row yet; this is the first scan of the day.
    InsertFresh,
}

fn classify_missed_update(existing: i64, limit: i64) -> MissedUpdate {
    if existing >= limit {
        MissedUpdate::LimitReached
    } else if existing > 0 {
        MissedUpdate::RetryUpdate
    } else {
        MissedUpdate::InsertFresh
    }
}

/// MySQL has no `RETURNING`, so the increment is a guarded UPDATE followed by
/// an INSERT for the first scan of the day. A duplicate-key error on the
/// INSERT means another request created the row in between, in which case the
/// UPDATE is retried.
async fn increment_mysql(
    pool: &MySqlPool,
    user_id: i64,
    date: NaiveDate,
    limit: i64,
) -> Result<Option<i64>> {
    for _ in 0..3 {
        let updated = sqlx::query(
            r#"
            UPDATE scan_ledger
            SET count = count + 1, updated_at = ?
            WHERE user_id = ? AND scan_date = ? AND count < ?
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .bind(date)
        .bind(limit)
        .execute(pool)
        .await
        .context("Failed to increment scan ledger")?;

        if updated.rows_affected() > 0 {
            let count = count_mysql(pool, user_id, date).await?;
            return Ok(Some(count));
        }

        let existing = count_mysql(pool, user_id, date).await?;
        match classify_missed_update(existing, limit) {
            MissedUpdate::LimitReached => return Ok(None),
            MissedUpdate::RetryUpdate => continue,
            MissedUpdate::InsertFresh => {}
        }

        let inserted = sqlx::query(
            r#"
            INSERT IGNORE INTO scan_ledger (user_id, scan_date, count, updated_at)
            VALUES (?, ?, 1, ?)
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create scan ledger row")?;

        if inserted.rows_affected() > 0 {
            return Ok(Some(1));
        }
        // Lost the insert race; retry the guarded update.
    }

    anyhow::bail!("Scan ledger increment did not settle after retries")
}

async fn count_mysql(pool: &MySqlPool, user_id: i64, date: NaiveDate) -> Result<i64> {
    let row = sqlx::query("SELECT count FROM scan_ledger WHERE user_id = ? AND scan_date = ?")
        .bind(user_id)
        .bind(date)
        .fetch_optional(pool)
        .await
        .context("Failed to read scan ledger")?;

    Ok(row.map(|row| row.get::<i64, _>("count")).unwrap_or(0))
}
