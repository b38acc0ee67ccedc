//! # Repository Module
//!
//! Database repository implementations for the local durable store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  OfflineCacheManager / SyncEngine                                      │
//! │       │                                                                 │
//! │       │  db.queue().get_pending(store_id)                              │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  SalesQueueRepository                                                  │
//! │  ├── insert(&self, sale)                                               │
//! │  ├── get_pending(&self, store_id)                                      │
//! │  ├── mark_synced(&self, client_ref, group_id)                          │
//! │  └── mark_failed(&self, client_ref, error)                             │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • SQL is isolated in one place                                        │
//! │  • Easy to test against an in-memory database                          │
//! │  • Row ↔ domain-type conversion lives next to the queries              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductCacheRepository`] - Product cache and barcode lookup
//! - [`inventory::InventoryCacheRepository`] - Inventory cache and local decrements
//! - [`queue::SalesQueueRepository`] - Offline sales queue
//! - [`status::SyncStatusRepository`] - Sync status singleton

pub mod inventory;
pub mod product;
pub mod queue;
pub mod status;
