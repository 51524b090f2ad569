//! SQLite implementation of ICursorStore
//!
//! The context lives in the single row of `sync_state`.
//!
//! ## Type Mapping
//!
//! | Domain Type     | Column           | Strategy                                   |
//! |-----------------|------------------|--------------------------------------------|
//! | SyncCursor      | `last_sync_time` | RFC 3339 via `to_rfc3339()` / `parse_from_rfc3339()` |
//! | BackupPeriod    | `backup_period`  | `yyyyMM` via `to_string()` / `FromStr`     |
//! | RemoteId        | `backup_id`      | String via `.as_str()` / `RemoteId::new()` |
//!
//! `backup_period` and `backup_id` are both NULL when no container is cached.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use picsync_core::domain::{BackupContainer, BackupPeriod, RemoteId, SyncContext, SyncCursor};
use picsync_core::ports::ICursorStore;

use crate::CacheError;

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Reconstruct a SyncContext from the `sync_state` row
fn context_from_row(row: &SqliteRow) -> Result<SyncContext, CacheError> {
    let last_sync_str: String = row.get("last_sync_time");
    let period_str: Option<String> = row.get("backup_period");
    let backup_id_str: Option<String> = row.get("backup_id");

    let cursor = SyncCursor::at(parse_datetime(&last_sync_str)?);

    let backup = match (period_str, backup_id_str) {
        (Some(period_str), Some(id_str)) => {
            let period: BackupPeriod = period_str.parse().map_err(|e| {
                CacheError::SerializationError(format!(
                    "Invalid BackupPeriod '{}': {}",
                    period_str, e
                ))
            })?;
            let id = RemoteId::new(id_str.clone()).map_err(|e| {
                CacheError::SerializationError(format!("Invalid RemoteId '{}': {}", id_str, e))
            })?;
            Some(BackupContainer::new(period, id))
        }
        _ => None,
    };

    Ok(SyncContext { cursor, backup })
}

/// SQLite-backed [`ICursorStore`]
#[derive(Clone)]
pub struct SqliteCursorStore {
    pool: SqlitePool,
}

impl SqliteCursorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Deletes the stored context so the next run starts from the beginning
    pub async fn clear(&self) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM sync_state").execute(&self.pool).await?;
        tracing::debug!("Cleared sync state");
        Ok(())
    }

    /// Time of the last successful save, if any
    pub async fn updated_at(&self) -> Result<Option<DateTime<Utc>>, CacheError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT updated_at FROM sync_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        value.as_deref().map(parse_datetime).transpose()
    }
}

#[async_trait::async_trait]
impl ICursorStore for SqliteCursorStore {
    async fn load(&self) -> anyhow::Result<Option<SyncContext>> {
        let row = sqlx::query(
            "SELECT last_sync_time, backup_period, backup_id FROM sync_state WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(context_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, context: &SyncContext) -> anyhow::Result<()> {
        let last_sync_time = context.cursor.last_sync_time().to_rfc3339();
        let backup_period = context.backup.as_ref().map(|b| b.period.to_string());
        let backup_id = context.backup.as_ref().map(|b| b.id.as_str().to_string());
        let updated_at = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT OR REPLACE INTO sync_state \
             (id, last_sync_time, backup_period, backup_id, updated_at) \
             VALUES (1, ?, ?, ?, ?)",
        )
        .bind(&last_sync_time)
        .bind(&backup_period)
        .bind(&backup_id)
        .bind(&updated_at)
        .execute(&self.pool)
        .await
        .map_err(CacheError::from)?;

        tracing::trace!(last_sync_time = %last_sync_time, "Saved sync context");
        Ok(())
    }
}
