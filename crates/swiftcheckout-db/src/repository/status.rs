//! # Sync Status Repository
//!
//! The singleton sync-status record: pause flag plus last-sync timestamp.
//!
//! Lazily created with defaults on first read (`id = "main"`); updated as
//! a read-then-write merge, acceptable because there is no concurrent
//! writer within one process.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use swiftcheckout_core::types::SyncStatusRecord;
use swiftcheckout_core::SYNC_STATUS_ID;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    id: String,
    is_paused: bool,
    last_sync_at: Option<DateTime<Utc>>,
}

impl StatusRow {
    fn into_status(self) -> SyncStatusRecord {
        SyncStatusRecord {
            id: self.id,
            is_paused: self.is_paused,
            last_sync_at: self.last_sync_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the sync status singleton.
#[derive(Debug, Clone)]
pub struct SyncStatusRepository {
    pool: SqlitePool,
}

impl SyncStatusRepository {
    /// Creates a new SyncStatusRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SyncStatusRepository { pool }
    }

    /// Gets the status record, creating it with defaults on first access.
    pub async fn get_or_init(&self) -> DbResult<SyncStatusRecord> {
        let row: Option<StatusRow> =
            sqlx::query_as("SELECT id, is_paused, last_sync_at FROM sync_status WHERE id = ?1")
                .bind(SYNC_STATUS_ID)
                .fetch_optional(&self.pool)
                .await?;

        if let Some(row) = row {
            return Ok(row.into_status());
        }

        debug!("Initializing sync status record");
        let status = SyncStatusRecord::default();
        sqlx::query(
            "INSERT OR IGNORE INTO sync_status (id, is_paused, last_sync_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&status.id)
        .bind(status.is_paused)
        .bind(status.last_sync_at)
        .execute(&self.pool)
        .await?;

        Ok(status)
    }

    /// Sets the pause flag.
    ///
    /// A running sync pass re-reads this flag between records, so a pause
    /// takes effect mid-pass without losing already-synced results.
    pub async fn set_paused(&self, paused: bool) -> DbResult<()> {
        // ensure the row exists before the merge-update
        self.get_or_init().await?;

        sqlx::query("UPDATE sync_status SET is_paused = ?2 WHERE id = ?1")
            .bind(SYNC_STATUS_ID)
            .bind(paused)
            .execute(&self.pool)
            .await?;

        debug!(paused, "Sync pause flag updated");
        Ok(())
    }

    /// Stamps the last-sync timestamp.
    ///
    /// Called after EVERY pass, whether or not anything synced.
    pub async fn stamp_last_sync(&self, at: DateTime<Utc>) -> DbResult<()> {
        self.get_or_init().await?;

        sqlx::query("UPDATE sync_status SET last_sync_at = ?2 WHERE id = ?1")
            .bind(SYNC_STATUS_ID)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_lazy_default_initialization() {
        let db = test_db().await;
        let repo = db.sync_status();

        let status = repo.get_or_init().await.unwrap();
        assert_eq!(status.id, SYNC_STATUS_ID);
        assert!(!status.is_paused);
        assert!(status.last_sync_at.is_none());

        // second read hits the persisted row, still a single record
        let again = repo.get_or_init().await.unwrap();
        assert_eq!(again.id, status.id);
    }

    #[tokio::test]
    async fn test_pause_resume_round_trip() {
        let db = test_db().await;
        let repo = db.sync_status();

        repo.set_paused(true).await.unwrap();
        assert!(repo.get_or_init().await.unwrap().is_paused);

        repo.set_paused(false).await.unwrap();
        assert!(!repo.get_or_init().await.unwrap().is_paused);
    }

    #[tokio::test]
    async fn test_stamp_last_sync() {
        let db = test_db().await;
        let repo = db.sync_status();

        let at = Utc::now();
        repo.stamp_last_sync(at).await.unwrap();

        let status = repo.get_or_init().await.unwrap();
        let stamped = status.last_sync_at.unwrap();
        assert!((stamped - at).num_seconds().abs() < 2);
    }
}
