//! # Inventory Cache Repository
//!
//! Per-store inventory levels, composite-keyed by (product_id, store_id).
//!
//! ## The Optimistic Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Local Quantity Updates                               │
//! │                                                                         │
//! │  Queue a sale offline (qty 2)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE cached_inventory SET                                           │
//! │      available_qty = MAX(0, available_qty + (-2)),  ← floored at zero  │
//! │      total_sold    = total_sold + 2                                    │
//! │                                                                         │
//! │  Decrements from MULTIPLE queued sales apply cumulatively (the SQL     │
//! │  update is read-modify-write inside the engine, never last-write-wins  │
//! │  in Rust).                                                             │
//! │                                                                         │
//! │  No row for the product? The update is a no-op, not an error.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use swiftcheckout_core::types::CachedInventory;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct InventoryRow {
    product_id: String,
    store_id: i64,
    available_qty: i64,
    total_sold: i64,
    cached_at: DateTime<Utc>,
}

impl InventoryRow {
    fn into_inventory(self) -> CachedInventory {
        CachedInventory {
            product_id: self.product_id,
            store_id: self.store_id,
            available_qty: self.available_qty,
            total_sold: self.total_sold,
            cached_at: self.cached_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the inventory cache.
#[derive(Debug, Clone)]
pub struct InventoryCacheRepository {
    pool: SqlitePool,
}

impl InventoryCacheRepository {
    /// Creates a new InventoryCacheRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryCacheRepository { pool }
    }

    /// Bulk-upserts inventory levels, stamping each with a fresh re-cache
    /// timestamp. Idempotent: keyed by (product_id, store_id).
    pub async fn cache_inventories(&self, inventories: &[CachedInventory]) -> DbResult<u64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for inv in inventories {
            sqlx::query(
                r#"
                INSERT INTO cached_inventory (
                    product_id, store_id, available_qty, total_sold, cached_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (product_id, store_id) DO UPDATE SET
                    available_qty = excluded.available_qty,
                    total_sold = excluded.total_sold,
                    cached_at = excluded.cached_at
                "#,
            )
            .bind(&inv.product_id)
            .bind(inv.store_id)
            .bind(inv.available_qty)
            .bind(inv.total_sold)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(count = inventories.len(), "Inventories re-cached");
        Ok(inventories.len() as u64)
    }

    /// Composite-key lookup; `Ok(None)` if absent.
    pub async fn get_by_product(
        &self,
        product_id: &str,
        store_id: i64,
    ) -> DbResult<Option<CachedInventory>> {
        let row: Option<InventoryRow> = sqlx::query_as(
            r#"
            SELECT product_id, store_id, available_qty, total_sold, cached_at
            FROM cached_inventory
            WHERE product_id = ?1 AND store_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(InventoryRow::into_inventory))
    }

    /// Applies a local quantity delta, flooring `available_qty` at zero.
    ///
    /// ## Arguments
    /// * `qty_change` - signed delta; a sale of 2 units passes `-2`
    ///
    /// ## Behavior
    /// - `available_qty` never goes negative, no matter how large the
    ///   decrement
    /// - negative deltas also advance `total_sold`
    /// - no row for the product: no-op (`Ok(false)`), not an error
    pub async fn update_local_qty(
        &self,
        product_id: &str,
        store_id: i64,
        qty_change: i64,
    ) -> DbResult<bool> {
        let sold = if qty_change < 0 { -qty_change } else { 0 };

        let result = sqlx::query(
            r#"
            UPDATE cached_inventory SET
                available_qty = MAX(0, available_qty + ?3),
                total_sold = total_sold + ?4
            WHERE product_id = ?1 AND store_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(store_id)
        .bind(qty_change)
        .bind(sold)
        .execute(&self.pool)
        .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            debug!(product_id, store_id, qty_change, "Local quantity updated");
        }
        Ok(updated)
    }

    /// Lists all cached inventory levels for a store.
    pub async fn list_for_store(&self, store_id: i64) -> DbResult<Vec<CachedInventory>> {
        let rows: Vec<InventoryRow> = sqlx::query_as(
            r#"
            SELECT product_id, store_id, available_qty, total_sold, cached_at
            FROM cached_inventory
            WHERE store_id = ?1
            ORDER BY product_id ASC
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InventoryRow::into_inventory).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn inventory(product_id: &str, available: i64) -> CachedInventory {
        CachedInventory {
            product_id: product_id.to_string(),
            store_id: 7,
            available_qty: available,
            total_sold: 0,
            cached_at: Utc::now(),
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_cache_and_lookup() {
        let db = test_db().await;
        let repo = db.inventories();

        repo.cache_inventories(&[inventory("prod-1", 5)]).await.unwrap();

        let inv = repo.get_by_product("prod-1", 7).await.unwrap().unwrap();
        assert_eq!(inv.available_qty, 5);

        assert!(repo.get_by_product("prod-1", 8).await.unwrap().is_none());
    }

    /// available_qty = 3, two offline sales of qty 2 each: after both
    /// decrements the level reads 0, not -1.
    #[tokio::test]
    async fn test_decrements_floor_at_zero_cumulatively() {
        let db = test_db().await;
        let repo = db.inventories();

        repo.cache_inventories(&[inventory("prod-1", 3)]).await.unwrap();

        repo.update_local_qty("prod-1", 7, -2).await.unwrap();
        let inv = repo.get_by_product("prod-1", 7).await.unwrap().unwrap();
        assert_eq!(inv.available_qty, 1);

        repo.update_local_qty("prod-1", 7, -2).await.unwrap();
        let inv = repo.get_by_product("prod-1", 7).await.unwrap().unwrap();
        assert_eq!(inv.available_qty, 0);
        assert_eq!(inv.total_sold, 4);
    }

    #[tokio::test]
    async fn test_huge_decrement_still_floors() {
        let db = test_db().await;
        let repo = db.inventories();

        repo.cache_inventories(&[inventory("prod-1", 2)]).await.unwrap();
        repo.update_local_qty("prod-1", 7, -1000).await.unwrap();

        let inv = repo.get_by_product("prod-1", 7).await.unwrap().unwrap();
        assert_eq!(inv.available_qty, 0);
    }

    #[tokio::test]
    async fn test_missing_record_is_noop() {
        let db = test_db().await;
        let repo = db.inventories();

        let updated = repo.update_local_qty("ghost", 7, -1).await.unwrap();
        assert!(!updated);
    }
}
