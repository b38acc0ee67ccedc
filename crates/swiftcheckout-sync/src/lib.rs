//! # swiftcheckout-sync: Sync Engine for SwiftCheckout
//!
//! The connectivity-aware layer of the offline-first checkout engine:
//! queues sales locally while offline and replays them against the hosted
//! sales gateway once connectivity returns.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Offline-First Sync Architecture                     │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │              OfflineCacheManager (UI entry point)                │  │
//! │  │                                                                  │  │
//! │  │  submit_sale / load_data / sync_all / pause / resume / clear     │  │
//! │  └──────┬──────────────────┬───────────────────────┬────────────────┘  │
//! │         │                  │                       │                   │
//! │         ▼                  ▼                       ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ Connectivity   │  │   SyncEngine   │  │   SalesGateway         │    │
//! │  │ Monitor        │  │                │  │                        │    │
//! │  │                │  │ Drains the     │  │ HTTP client for the    │    │
//! │  │ watch channel, │  │ sales queue,   │  │ hosted backend:        │    │
//! │  │ online→offline │  │ idempotent     │  │ products, inventory,   │    │
//! │  │ transitions    │  │ replay, pause  │  │ sale groups & lines    │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │         │                  │                       │                   │
//! │         └──────────────────┴───────────┬───────────┘                   │
//! │                                        ▼                               │
//! │                         swiftcheckout-db (Local Durable Store)        │
//! │                                                                         │
//! │  PROGRESS EVENTS (to the UI):                                          │
//! │  • SyncProgress {current, total, synced, failed} per record            │
//! │  • CheckoutEvent notifications (queued, synced, failed, paused, ...)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`manager`] - `OfflineCacheManager`, the single UI-facing entry point
//! - [`engine`] - `SyncEngine`, the queue replay state machine
//! - [`gateway`] - `SalesGateway` trait + HTTP implementation + wire types
//! - [`connectivity`] - online/offline watch-channel monitor
//! - [`session`] - injected session context (store/user identity)
//! - [`events`] - user-facing notification sink
//! - [`config`] - TOML + environment configuration
//! - [`error`] - sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use swiftcheckout_sync::{OfflineCacheManager, SyncConfig, SessionContext};
//! use swiftcheckout_db::{Database, DbConfig};
//!
//! let config = SyncConfig::load_or_default(None);
//! let db = Database::new(DbConfig::new(&config.storage.database_path)).await?;
//! let session = SessionContext::new(Some(7), "user-1", "owner-1", "clerk@example.com");
//!
//! let manager = OfflineCacheManager::with_http_gateway(config, db, session)?;
//!
//! // Queue a sale (works online or offline)
//! let queued = manager.submit_sale(candidate).await?;
//!
//! // Drain the queue once online
//! let outcome = manager.sync_all().await?;
//! println!("synced={} failed={}", outcome.synced, outcome.failed);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;
pub mod manager;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{GatewaySettings, StorageSettings, SyncConfig, SyncSettings};
pub use connectivity::{ConnectivityMonitor, ConnectivityState};
pub use engine::{SyncEngine, SyncOutcome, SyncProgress};
pub use error::{SyncError, SyncResult};
pub use events::{CheckoutEvent, CheckoutEventSink, NoOpSink};
pub use gateway::{HttpSalesGateway, SalesGateway};
pub use manager::{DeviceStatus, OfflineCacheManager, SubmitOutcome};
pub use session::SessionContext;
