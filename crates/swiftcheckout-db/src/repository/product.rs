//! # Product Cache Repository
//!
//! Product cache refreshed from the remote gateway, read offline at the
//! register.
//!
//! ## Barcode Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    get_by_barcode(" imei123 ", 7)                       │
//! │                                                                         │
//! │  1. normalize: trim + uppercase  →  "IMEI123"                          │
//! │  2. SQL prefilter: candidates whose delimited device_ids CONTAIN the   │
//! │     code, or whose own id matches (non-serialized fallback)            │
//! │  3. Exact verification in Rust against the PARSED device list          │
//! │     (the SQL instr() can partial-match a longer identifier)            │
//! │  4. No match → Ok(None). Never an error for "not found".               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use swiftcheckout_core::checkout::normalize_barcode;
use swiftcheckout_core::types::{parse_device_ids, parse_device_sizes, CachedProduct};

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw row shape: device lists in the gateway's delimited form.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    store_id: i64,
    name: String,
    device_ids: String,
    device_sizes: String,
    price_cents: i64,
    cost_cents: Option<i64>,
    cached_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> CachedProduct {
        let mut product = CachedProduct {
            id: self.id,
            store_id: self.store_id,
            name: self.name,
            device_ids: parse_device_ids(&self.device_ids),
            device_sizes: parse_device_sizes(&self.device_sizes),
            price_cents: self.price_cents,
            cost_cents: self.cost_cents,
            cached_at: self.cached_at,
        };
        // alignment invariant holds no matter how ragged the stored form was
        product.align_sizes();
        product
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the product cache.
#[derive(Debug, Clone)]
pub struct ProductCacheRepository {
    pool: SqlitePool,
}

impl ProductCacheRepository {
    /// Creates a new ProductCacheRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductCacheRepository { pool }
    }

    /// Bulk-upserts products, stamping each with a fresh re-cache timestamp.
    ///
    /// Idempotent: keyed by (id, store_id), re-caching the same list twice
    /// leaves one row per product.
    ///
    /// ## Returns
    /// Number of rows written.
    pub async fn cache_products(&self, products: &[CachedProduct]) -> DbResult<u64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for product in products {
            let device_ids = product.device_ids.join(",");
            let device_sizes = product.device_sizes.join(",");

            sqlx::query(
                r#"
                INSERT INTO cached_products (
                    id, store_id, name, device_ids, device_sizes,
                    price_cents, cost_cents, cached_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT (id, store_id) DO UPDATE SET
                    name = excluded.name,
                    device_ids = excluded.device_ids,
                    device_sizes = excluded.device_sizes,
                    price_cents = excluded.price_cents,
                    cost_cents = excluded.cost_cents,
                    cached_at = excluded.cached_at
                "#,
            )
            .bind(&product.id)
            .bind(product.store_id)
            .bind(&product.name)
            .bind(device_ids)
            .bind(device_sizes)
            .bind(product.price_cents)
            .bind(product.cost_cents)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(count = products.len(), "Products re-cached");
        Ok(products.len() as u64)
    }

    /// Gets a cached product by its id within a store.
    pub async fn get_by_id(&self, id: &str, store_id: i64) -> DbResult<Option<CachedProduct>> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, store_id, name, device_ids, device_sizes,
                   price_cents, cost_cents, cached_at
            FROM cached_products
            WHERE id = ?1 AND store_id = ?2
            "#,
        )
        .bind(id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProductRow::into_product))
    }

    /// Resolves a scanned code to a cached product.
    ///
    /// Normalizes the code (trim + uppercase), then matches it against each
    /// product's parsed device-identifier list OR against the product's own
    /// identifier (fallback path for non-serialized lookups).
    ///
    /// ## Returns
    /// `Ok(None)` on no match - "not found" is never an error here.
    pub async fn get_by_barcode(&self, code: &str, store_id: i64) -> DbResult<Option<CachedProduct>> {
        let code = match normalize_barcode(code) {
            Ok(code) => code,
            Err(_) => return Ok(None),
        };

        // Cheap SQL prefilter; exact membership verified against the parsed
        // list below.
        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, store_id, name, device_ids, device_sizes,
                   price_cents, cost_cents, cached_at
            FROM cached_products
            WHERE store_id = ?1
              AND (instr(UPPER(device_ids), ?2) > 0 OR UPPER(id) = ?2)
            "#,
        )
        .bind(store_id)
        .bind(&code)
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let product = row.into_product();
            if product.device_index(&code).is_some() || product.id.eq_ignore_ascii_case(&code) {
                return Ok(Some(product));
            }
        }

        Ok(None)
    }

    /// Lists all cached products for a store.
    pub async fn list_for_store(&self, store_id: i64) -> DbResult<Vec<CachedProduct>> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, store_id, name, device_ids, device_sizes,
                   price_cents, cost_cents, cached_at
            FROM cached_products
            WHERE store_id = ?1
            ORDER BY name ASC
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductRow::into_product).collect())
    }

    /// Counts cached products for a store.
    pub async fn count_for_store(&self, store_id: i64) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cached_products WHERE store_id = ?1")
                .bind(store_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn product(id: &str, name: &str, device_ids: &[&str]) -> CachedProduct {
        CachedProduct {
            id: id.to_string(),
            store_id: 7,
            name: name.to_string(),
            device_ids: device_ids.iter().map(|s| s.to_string()).collect(),
            device_sizes: Vec::new(),
            price_cents: 49900,
            cost_cents: Some(30000),
            cached_at: Utc::now(),
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_cache_and_lookup_by_barcode() {
        let db = test_db().await;
        let repo = db.products();

        repo.cache_products(&[product("prod-1", "Phone X", &["IMEI123", "IMEI456"])])
            .await
            .unwrap();

        // lowercase, padded input still resolves
        let hit = repo.get_by_barcode(" imei456 ", 7).await.unwrap().unwrap();
        assert_eq!(hit.id, "prod-1");

        // wrong store misses
        assert!(repo.get_by_barcode("IMEI456", 8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_barcode_fallback_to_product_id() {
        let db = test_db().await;
        let repo = db.products();

        repo.cache_products(&[product("SKU-99", "Charger", &[])])
            .await
            .unwrap();

        let hit = repo.get_by_barcode("sku-99", 7).await.unwrap().unwrap();
        assert_eq!(hit.name, "Charger");
    }

    #[tokio::test]
    async fn test_no_match_returns_none_not_error() {
        let db = test_db().await;
        let repo = db.products();

        assert!(repo.get_by_barcode("UNKNOWN", 7).await.unwrap().is_none());
        assert!(repo.get_by_barcode("   ", 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recache_is_idempotent() {
        let db = test_db().await;
        let repo = db.products();

        let p = product("prod-1", "Phone X", &["IMEI123"]);
        repo.cache_products(std::slice::from_ref(&p)).await.unwrap();

        let mut renamed = p.clone();
        renamed.name = "Phone X Pro".to_string();
        repo.cache_products(&[renamed]).await.unwrap();

        assert_eq!(repo.count_for_store(7).await.unwrap(), 1);
        let hit = repo.get_by_id("prod-1", 7).await.unwrap().unwrap();
        assert_eq!(hit.name, "Phone X Pro");
    }

    #[tokio::test]
    async fn test_prefilter_does_not_partial_match() {
        let db = test_db().await;
        let repo = db.products();

        // "IMEI12" is a prefix of a stored identifier but not a member
        repo.cache_products(&[product("prod-1", "Phone X", &["IMEI123"])])
            .await
            .unwrap();

        assert!(repo.get_by_barcode("IMEI12", 7).await.unwrap().is_none());
    }
}
