//! # Sales Queue Repository
//!
//! The offline sales queue: locally persisted, not-yet-confirmed sales
//! awaiting network replay.
//!
//! ## The Queue Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Offline Queue Implementation                         │
//! │                                                                         │
//! │  REGISTER OPERATION (queue_sale)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO sales_queue (client_ref, payload, synced=0, ...)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Sale is durable ← survives crash/restart, visible as "pending"        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                SYNC ENGINE (when online)                        │   │
//! │  │                                                                 │   │
//! │  │  1. SELECT * FROM sales_queue WHERE synced = 0                 │   │
//! │  │  2. For each record:                                           │   │
//! │  │     a. Replay against the remote gateway (keyed by client_ref) │   │
//! │  │     b. Success: UPDATE synced=1, server_sale_group_id,         │   │
//! │  │                 clear sync_error/last_sync_attempt             │   │
//! │  │     c. Failure: UPDATE sync_error, last_sync_attempt           │   │
//! │  │        (record KEPT - retried on the next pass)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • A sale is never lost (durable before any network attempt)           │
//! │  • client_ref doubles as the remote idempotency token                  │
//! │  • Failed records are never auto-deleted                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payloads are stored as JSON. Legacy flat-shaped payloads written by
//! older clients are normalized to the canonical `lines[]` shape on read.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use swiftcheckout_core::sale::{QueuedSale, StoredSale};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    client_ref: String,
    store_id: i64,
    payload: String,
    payment_method: String,
    customer_id: Option<String>,
    email_receipt: bool,
    synced: bool,
    server_sale_group_id: Option<String>,
    sync_error: Option<String>,
    last_sync_attempt: Option<DateTime<Utc>>,
    sold_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl QueueRow {
    /// Parses the stored payload (either shape) and normalizes it into a
    /// canonical [`QueuedSale`].
    fn into_sale(self) -> DbResult<QueuedSale> {
        let stored: StoredSale =
            serde_json::from_str(&self.payload).map_err(|e| DbError::CorruptPayload {
                client_ref: self.client_ref.clone(),
                reason: e.to_string(),
            })?;
        let lined = stored.into_lined();

        Ok(QueuedSale {
            client_ref: self.client_ref,
            store_id: self.store_id,
            lines: lined.lines,
            total_override_cents: lined.total_cents,
            payment_method: self.payment_method,
            customer_id: self.customer_id,
            email_receipt: self.email_receipt,
            synced: self.synced,
            server_sale_group_id: self.server_sale_group_id,
            sync_error: self.sync_error,
            last_sync_attempt: self.last_sync_attempt,
            sold_at: self.sold_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT client_ref, store_id, payload, payment_method, customer_id,
           email_receipt, synced, server_sale_group_id, sync_error,
           last_sync_attempt, sold_at, created_at, updated_at
    FROM sales_queue
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for the offline sales queue.
#[derive(Debug, Clone)]
pub struct SalesQueueRepository {
    pool: SqlitePool,
}

impl SalesQueueRepository {
    /// Creates a new SalesQueueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SalesQueueRepository { pool }
    }

    /// Persists a new pending sale.
    ///
    /// The payload is stored in the canonical `lines[]` JSON shape. Fails
    /// with a unique violation if the `client_ref` already exists - the
    /// caller generated it, so a collision means a double insert.
    pub async fn insert(&self, sale: &QueuedSale) -> DbResult<()> {
        let payload = serde_json::to_string(&sale.payload()).map_err(|e| {
            DbError::Internal(format!("sale payload serialization failed: {e}"))
        })?;

        debug!(
            client_ref = %sale.client_ref,
            store_id = sale.store_id,
            total = %sale.total(),
            "Queueing sale"
        );

        sqlx::query(
            r#"
            INSERT INTO sales_queue (
                client_ref, store_id, payload, payment_method, customer_id,
                email_receipt, synced, server_sale_group_id, sync_error,
                last_sync_attempt, sold_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&sale.client_ref)
        .bind(sale.store_id)
        .bind(payload)
        .bind(&sale.payment_method)
        .bind(&sale.customer_id)
        .bind(sale.email_receipt)
        .bind(sale.synced)
        .bind(&sale.server_sale_group_id)
        .bind(&sale.sync_error)
        .bind(sale.last_sync_attempt)
        .bind(sale.sold_at)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a sale by its client reference.
    pub async fn get_by_client_ref(&self, client_ref: &str) -> DbResult<Option<QueuedSale>> {
        let row: Option<QueueRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE client_ref = ?1"))
                .bind(client_ref)
                .fetch_optional(&self.pool)
                .await?;

        row.map(QueueRow::into_sale).transpose()
    }

    /// Gets pending (not yet synced) sales for a store, oldest first.
    ///
    /// The order is stable for a given snapshot; the sync pass processes
    /// records in exactly this order.
    pub async fn get_pending(&self, store_id: i64) -> DbResult<Vec<QueuedSale>> {
        let rows: Vec<QueueRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE store_id = ?1 AND synced = 0 ORDER BY created_at ASC"
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QueueRow::into_sale).collect()
    }

    /// Gets all sales (pending and synced) for a store, newest first.
    pub async fn get_all(&self, store_id: i64) -> DbResult<Vec<QueuedSale>> {
        let rows: Vec<QueueRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE store_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QueueRow::into_sale).collect()
    }

    /// Counts pending sales for a store.
    pub async fn count_pending(&self, store_id: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sales_queue WHERE store_id = ?1 AND synced = 0",
        )
        .bind(store_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Marks a sale as successfully synced (terminal state).
    ///
    /// Stores the remote sale-group id and clears the failure columns.
    pub async fn mark_synced(&self, client_ref: &str, server_sale_group_id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE sales_queue SET
                synced = 1,
                server_sale_group_id = ?2,
                sync_error = NULL,
                last_sync_attempt = NULL,
                updated_at = ?3
            WHERE client_ref = ?1
            "#,
        )
        .bind(client_ref)
        .bind(server_sale_group_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(client_ref, server_sale_group_id, "Sale marked synced");
        Ok(())
    }

    /// Records a sync failure. The record stays pending for the next pass.
    pub async fn mark_failed(&self, client_ref: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE sales_queue SET
                sync_error = ?2,
                last_sync_attempt = ?3,
                updated_at = ?3
            WHERE client_ref = ?1
            "#,
        )
        .bind(client_ref)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(client_ref, error, "Sale marked failed");
        Ok(())
    }

    /// Deletes pending sales, optionally scoped to one store.
    ///
    /// Synced records are kept (they are the local receipt trail). The
    /// caller is responsible for user confirmation; the deletion here is
    /// unconditional.
    ///
    /// ## Returns
    /// Number of deleted records.
    pub async fn clear_pending(&self, store_id: Option<i64>) -> DbResult<u64> {
        let result = match store_id {
            Some(store_id) => {
                sqlx::query("DELETE FROM sales_queue WHERE synced = 0 AND store_id = ?1")
                    .bind(store_id)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM sales_queue WHERE synced = 0")
                    .execute(&self.pool)
                    .await?
            }
        };

        debug!(deleted = result.rows_affected(), "Pending queue cleared");
        Ok(result.rows_affected())
    }

    /// Deletes a single queue entry.
    ///
    /// ## Returns
    /// * `Ok(true)` - the record existed and was deleted
    /// * `Ok(false)` - no record with that `client_ref`
    pub async fn delete_by_client_ref(&self, client_ref: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM sales_queue WHERE client_ref = ?1")
            .bind(client_ref)
            .execute(&self.pool)
            .await?;

        debug!(client_ref, deleted = result.rows_affected() > 0, "Queue entry delete");
        Ok(result.rows_affected() > 0)
    }

    /// Scans the local queue for a device identifier.
    ///
    /// Offline fallback for the "already sold" check: when the gateway is
    /// unreachable, a device appearing in any locally recorded sale
    /// (pending or synced) blocks a second scan of the same unit.
    pub async fn find_sale_with_device(
        &self,
        device_id: &str,
        store_id: i64,
    ) -> DbResult<Option<QueuedSale>> {
        // instr prefilter; exact membership verified against parsed lines
        let rows: Vec<QueueRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE store_id = ?1 AND instr(UPPER(payload), ?2) > 0"
        ))
        .bind(store_id)
        .bind(device_id.to_uppercase())
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let sale = row.into_sale()?;
            let hit = sale.lines.iter().any(|line| {
                line.device_ids
                    .iter()
                    .any(|id| id.eq_ignore_ascii_case(device_id))
            });
            if hit {
                return Ok(Some(sale));
            }
        }

        Ok(None)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
