//! # swiftcheckout-db: Local Durable Store for SwiftCheckout
//!
//! On-device persistence for the offline-first checkout engine. SQLite via
//! sqlx, surviving process restarts and offline periods.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     SwiftCheckout Data Flow                             │
//! │                                                                         │
//! │  OfflineCacheManager (swiftcheckout-sync)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  swiftcheckout-db (THIS CRATE)                  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductCache  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryCache│    │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │ SalesQueue    │    │              │  │   │
//! │  │   │ Management    │    │ SyncStatus    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL mode)                                            │
//! │  • cached_products   • cached_inventory                                │
//! │  • sales_queue       • sync_status                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (products, inventory, queue, status)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use swiftcheckout_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/checkout.db")).await?;
//!
//! let product = db.products().get_by_barcode(" imei123 ", 7).await?;
//! let pending = db.queue().get_pending(7).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::inventory::InventoryCacheRepository;
pub use repository::product::ProductCacheRepository;
pub use repository::queue::SalesQueueRepository;
pub use repository::status::SyncStatusRepository;
