//! # Offline Cache Manager
//!
//! The single facade the register UI talks to: sale submission, cache
//! refresh, queue inspection, and sync control.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     OfflineCacheManager                                 │
//! │                                                                         │
//! │   UI ──► submit_sale ──┬── online ──► gateway (group + lines)          │
//! │                        │                 │ network failure              │
//! │                        │                 ▼                              │
//! │                        └── offline ──► sales_queue (SAME client_ref)   │
//! │                                                                         │
//! │   UI ──► load_data ───── online ──► gateway ──► re-cache               │
//! │                        └ offline/failed ──► serve cached data          │
//! │                                                                         │
//! │   UI ──► sync_all / pause_sync / resume_sync / clear_queue             │
//! │                                                                         │
//! │   connectivity watch ──► auto-sync task ──► one pass per transition    │
//! │                                             to online                   │
//! │                                                                         │
//! │  Durability rule: a submitted sale is persisted locally BEFORE any     │
//! │  network attempt. The client_ref minted at queue time is the           │
//! │  idempotency token for every later replay - it never changes.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::engine::{SyncEngine, SyncOutcome, SyncProgress};
use crate::error::{SyncError, SyncResult};
use crate::events::{CheckoutEvent, CheckoutEventSink, NoOpSink};
use crate::gateway::{
    HttpSalesGateway, SaleGroupRequest, SaleLineRequest, SalesGateway,
};
use crate::session::SessionContext;
use swiftcheckout_core::checkout::{normalize_barcode, CandidateSale};
use swiftcheckout_core::sale::QueuedSale;
use swiftcheckout_core::types::{CachedInventory, CachedProduct};
use swiftcheckout_db::Database;

// =============================================================================
// Outcome Types
// =============================================================================

/// How a submitted sale was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Confirmed remotely during submit.
    Synced {
        client_ref: String,
        server_sale_group_id: String,
    },
    /// Durably queued; will be replayed by a later sync pass.
    Queued { client_ref: String },
}

impl SubmitOutcome {
    pub fn client_ref(&self) -> &str {
        match self {
            SubmitOutcome::Synced { client_ref, .. } => client_ref,
            SubmitOutcome::Queued { client_ref } => client_ref,
        }
    }
}

/// Result of a device availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    Available,
    /// Confirmed sold in a prior remote sale.
    SoldRemotely { sale_id: String },
    /// Present in a locally queued, not-yet-synced sale.
    InPendingSale { client_ref: String },
}

// =============================================================================
// Manager
// =============================================================================

/// Facade over the queue, the caches, the gateway, and the sync engine.
///
/// Holds an injected [`SessionContext`]; no identity is read from ambient
/// global state. Clone-cheap collaborators ([`Database`],
/// [`ConnectivityMonitor`]) are shared, not duplicated.
pub struct OfflineCacheManager {
    config: SyncConfig,
    db: Database,
    session: SessionContext,
    gateway: Arc<dyn SalesGateway>,
    connectivity: ConnectivityMonitor,
    events: Arc<dyn CheckoutEventSink>,
    engine: SyncEngine,
}

impl OfflineCacheManager {
    /// Builds a manager from explicit collaborators.
    pub fn new(
        config: SyncConfig,
        db: Database,
        session: SessionContext,
        gateway: Arc<dyn SalesGateway>,
        connectivity: ConnectivityMonitor,
        events: Arc<dyn CheckoutEventSink>,
    ) -> Self {
        let engine = SyncEngine::new(db.clone(), gateway.clone(), events.clone());
        OfflineCacheManager {
            config,
            db,
            session,
            gateway,
            connectivity,
            events,
            engine,
        }
    }

    /// Convenience constructor wiring the production HTTP gateway, a
    /// default connectivity monitor, and no event sink.
    pub fn with_http_gateway(
        config: SyncConfig,
        db: Database,
        session: SessionContext,
    ) -> SyncResult<Self> {
        let gateway = Arc::new(HttpSalesGateway::new(&config.gateway)?);
        Ok(OfflineCacheManager::new(
            config,
            db,
            session,
            gateway,
            ConnectivityMonitor::default(),
            Arc::new(NoOpSink),
        ))
    }

    // =========================================================================
    // Status Accessors
    // =========================================================================

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn is_syncing(&self) -> bool {
        self.engine.is_syncing()
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Count of sales waiting for sync (the UI badge number).
    pub async fn pending_count(&self) -> SyncResult<i64> {
        let store_id = self.session.resolved_store_id()?;
        Ok(self.db.queue().count_pending(store_id).await?)
    }

    pub async fn is_paused(&self) -> SyncResult<bool> {
        Ok(self.db.sync_status().get_or_init().await?.is_paused)
    }

    pub async fn last_sync_at(&self) -> SyncResult<Option<DateTime<Utc>>> {
        Ok(self.db.sync_status().get_or_init().await?.last_sync_at)
    }

    // =========================================================================
    // Sale Submission
    // =========================================================================

    /// Submits a checkout.
    ///
    /// The sale is validated and persisted to the local queue FIRST; only
    /// then is a remote submit attempted. When that attempt dies on the
    /// network, the already-durable record simply stays queued - with the
    /// client_ref minted here, so the eventual replay is idempotent.
    ///
    /// ## Returns
    /// * `Ok(SubmitOutcome::Synced)` - confirmed remotely during submit
    /// * `Ok(SubmitOutcome::Queued)` - durable locally, replayed later
    /// * `Err(SyncError::Validation)` - nothing persisted
    pub async fn submit_sale(&self, mut candidate: CandidateSale) -> SyncResult<SubmitOutcome> {
        // Store identity comes from the injected session, always.
        let store_id = self.session.resolved_store_id()?;
        candidate.store_id = Some(store_id);

        let sale = candidate.build().map_err(SyncError::Validation)?;

        // Durable before any network attempt.
        self.db.queue().insert(&sale).await?;
        debug!(client_ref = %sale.client_ref, total = %sale.total(), "Sale queued");

        // Local inventory reflects the sale immediately, online or not.
        // Cumulative, floored at zero, silent when a product is uncached.
        for line in &sale.lines {
            self.db
                .inventories()
                .update_local_qty(&line.product_id, store_id, -line.quantity)
                .await?;
        }

        if !self.is_online() {
            self.events.emit(CheckoutEvent::SaleQueued {
                client_ref: sale.client_ref.clone(),
                total: sale.total(),
            });
            return Ok(SubmitOutcome::Queued {
                client_ref: sale.client_ref,
            });
        }

        match self.submit_remote(&sale).await {
            Ok(group_id) => {
                self.db
                    .queue()
                    .mark_synced(&sale.client_ref, &group_id)
                    .await?;
                self.events.emit(CheckoutEvent::SaleSynced {
                    client_ref: sale.client_ref.clone(),
                    server_sale_group_id: group_id.clone(),
                });
                Ok(SubmitOutcome::Synced {
                    client_ref: sale.client_ref,
                    server_sale_group_id: group_id,
                })
            }
            Err(err) if err.should_queue_offline() => {
                // The record is already durable; this is a fallback, not
                // a failure. Same client_ref replays later.
                info!(
                    client_ref = %sale.client_ref,
                    %err,
                    "Online submit failed, sale stays queued"
                );
                self.events.emit(CheckoutEvent::SaleQueued {
                    client_ref: sale.client_ref.clone(),
                    total: sale.total(),
                });
                Ok(SubmitOutcome::Queued {
                    client_ref: sale.client_ref,
                })
            }
            Err(err) => {
                // An explicit rejection. Keep the record for inspection
                // and manual retry; never delete.
                warn!(client_ref = %sale.client_ref, %err, "Online submit rejected");
                self.db
                    .queue()
                    .mark_failed(&sale.client_ref, &err.to_string())
                    .await?;
                self.events.emit(CheckoutEvent::SaleSyncFailed {
                    client_ref: sale.client_ref.clone(),
                    error: err.to_string(),
                });
                Ok(SubmitOutcome::Queued {
                    client_ref: sale.client_ref,
                })
            }
        }
    }

    /// One immediate remote submit: group, then lines.
    ///
    /// Same wire sequence as the sync engine's replay, and the same
    /// partial-failure contract: the group survives a line failure and is
    /// reused by the retry.
    async fn submit_remote(&self, sale: &QueuedSale) -> SyncResult<String> {
        let group = self
            .gateway
            .create_sale_group(&SaleGroupRequest {
                store_id: sale.store_id,
                total_amount: sale.total().cents(),
                payment_method: sale.payment_method.clone(),
                customer_id: sale.customer_id.clone(),
                email_receipt: sale.email_receipt,
                client_ref: sale.client_ref.clone(),
            })
            .await?;

        for line in &sale.lines {
            self.gateway
                .create_sale_line(&SaleLineRequest {
                    store_id: sale.store_id,
                    sale_group_id: group.id.clone(),
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price_cents,
                    device_ids: line.device_ids.clone(),
                    device_sizes: line.device_sizes.clone(),
                    payment_method: sale.payment_method.clone(),
                    customer_id: sale.customer_id.clone(),
                })
                .await?;
        }

        Ok(group.id)
    }

    // =========================================================================
    // Data Loading
    // =========================================================================

    /// Loads products and inventory, preferring the gateway and falling
    /// back to the local cache.
    ///
    /// A successful fetch atomically re-caches both datasets; any fetch
    /// failure (not just offline) degrades to cached data with a warning
    /// rather than an error - the register must keep selling.
    pub async fn load_data(&self) -> SyncResult<(Vec<CachedProduct>, Vec<CachedInventory>)> {
        let store_id = self.session.resolved_store_id()?;

        if self.is_online() {
            match self.fetch_and_cache(store_id).await {
                Ok(data) => return Ok(data),
                Err(err) => {
                    warn!(%err, "Gateway fetch failed, serving cached data");
                }
            }
        }

        let products = self.db.products().list_for_store(store_id).await?;
        let inventories = self.db.inventories().list_for_store(store_id).await?;
        debug!(
            products = products.len(),
            inventories = inventories.len(),
            "Serving cached data"
        );
        Ok((products, inventories))
    }

    async fn fetch_and_cache(
        &self,
        store_id: i64,
    ) -> SyncResult<(Vec<CachedProduct>, Vec<CachedInventory>)> {
        let products = self.gateway.fetch_products(store_id).await?;
        let inventories = self.gateway.fetch_inventory(store_id).await?;

        let cached_products = self.db.products().cache_products(&products).await?;
        let cached_inventories = self
            .db
            .inventories()
            .cache_inventories(&inventories)
            .await?;

        self.events.emit(CheckoutEvent::DataRefreshed {
            products: cached_products,
            inventories: cached_inventories,
        });
        Ok((products, inventories))
    }

    // =========================================================================
    // Sync Control
    // =========================================================================

    /// Runs one sync pass over the pending queue.
    ///
    /// Returns `{synced: 0, failed: 0}` without touching the network when
    /// offline or paused. A pass that synced anything refreshes the local
    /// caches afterwards (best effort).
    pub async fn sync_all(&self) -> SyncResult<SyncOutcome> {
        self.sync_all_with_progress(None).await
    }

    /// [`sync_all`](Self::sync_all) with a per-record progress stream.
    pub async fn sync_all_with_progress(
        &self,
        progress: Option<mpsc::UnboundedSender<SyncProgress>>,
    ) -> SyncResult<SyncOutcome> {
        let store_id = self.session.resolved_store_id()?;
        let outcome = self
            .engine
            .sync_all(store_id, self.is_online(), progress)
            .await?;

        if outcome.synced > 0 {
            if let Err(err) = self.fetch_and_cache(store_id).await {
                warn!(%err, "Post-sync cache refresh failed");
            }
        }
        Ok(outcome)
    }

    /// Pauses sync. A running pass stops between records.
    pub async fn pause_sync(&self) -> SyncResult<()> {
        self.db.sync_status().set_paused(true).await?;
        self.events.emit(CheckoutEvent::SyncPaused);
        Ok(())
    }

    /// Resumes sync. Does not start a pass by itself; the next explicit
    /// call or connectivity transition does.
    pub async fn resume_sync(&self) -> SyncResult<()> {
        self.db.sync_status().set_paused(false).await?;
        self.events.emit(CheckoutEvent::SyncResumed);
        Ok(())
    }

    /// Deletes all pending (never synced) sales for this store.
    pub async fn clear_queue(&self) -> SyncResult<u64> {
        let store_id = self.session.resolved_store_id()?;
        let deleted = self.db.queue().clear_pending(Some(store_id)).await?;
        info!(deleted, "Pending queue cleared");
        self.events.emit(CheckoutEvent::QueueCleared { deleted });
        Ok(deleted)
    }

    /// Pending sales, oldest first, lines always in canonical form.
    pub async fn get_pending_sales(&self) -> SyncResult<Vec<QueuedSale>> {
        let store_id = self.session.resolved_store_id()?;
        Ok(self.db.queue().get_pending(store_id).await?)
    }

    // =========================================================================
    // Device Checks
    // =========================================================================

    /// Checks whether a serialized device was already sold.
    ///
    /// Online, the gateway is authoritative; offline (or when the gateway
    /// call dies on the network), the local pending queue is consulted so
    /// a register cannot double-sell a device it queued minutes ago.
    pub async fn check_device_already_sold(&self, device_id: &str) -> SyncResult<DeviceStatus> {
        let store_id = self.session.resolved_store_id()?;

        // Scanners pad and lowercase; both stores hold normalized ids.
        // An empty scan matches nothing, so it is not a block.
        let device_id = match normalize_barcode(device_id) {
            Ok(code) => code,
            Err(_) => return Ok(DeviceStatus::Available),
        };

        if self.is_online() {
            match self.gateway.check_device_already_sold(&device_id, store_id).await {
                Ok(check) if check.already_sold => {
                    let sale_id = check.sale.map(|s| s.id).unwrap_or_default();
                    return Ok(DeviceStatus::SoldRemotely { sale_id });
                }
                Ok(_) => {}
                Err(err) if err.should_queue_offline() => {
                    debug!(%err, "Device check fell back to local queue");
                }
                Err(err) => return Err(err),
            }
        }

        match self.db.queue().find_sale_with_device(&device_id, store_id).await? {
            Some(sale) => Ok(DeviceStatus::InPendingSale {
                client_ref: sale.client_ref,
            }),
            None => Ok(DeviceStatus::Available),
        }
    }

    // =========================================================================
    // Auto-Sync
    // =========================================================================

    /// Spawns the background task that runs one sync pass per transition
    /// to online (when auto-sync is enabled in config).
    ///
    /// The engine's re-entrancy guard collapses overlapping triggers, so a
    /// flapping link can never start a second concurrent pass.
    pub fn spawn_auto_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut rx = self.connectivity.subscribe();
        let enabled = self.config.sync.auto_sync;

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = rx.borrow_and_update().is_online();
                if !online || !enabled {
                    continue;
                }
                info!("Connectivity restored, starting sync pass");
                match manager.sync_all().await {
                    Ok(outcome) => {
                        debug!(synced = outcome.synced, failed = outcome.failed, "Auto-sync pass done")
                    }
                    Err(SyncError::SyncInProgress) => {
                        debug!("Auto-sync skipped: pass already running")
                    }
                    Err(err) => warn!(%err, "Auto-sync pass failed"),
                }
            }
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{DeviceSoldCheck, RemoteSale, RemoteSaleGroup};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use swiftcheckout_core::checkout::CandidateLine;
    use swiftcheckout_db::DbConfig;

    // =========================================================================
    // Gateway Double
    // =========================================================================

    /// Gateway double: idempotent group creation plus switchable network
    /// failure for the line, fetch, and device-check endpoints.
    #[derive(Default)]
    struct FlakyGateway {
        groups: StdMutex<HashMap<String, String>>,
        group_calls: AtomicUsize,
        fail_lines: AtomicBool,
        fail_fetch: AtomicBool,
        fail_device_check: AtomicBool,
        products: StdMutex<Vec<CachedProduct>>,
        inventories: StdMutex<Vec<CachedInventory>>,
        sold_device: StdMutex<Option<String>>,
    }

    #[async_trait]
    impl SalesGateway for FlakyGateway {
        async fn fetch_products(&self, _store_id: i64) -> SyncResult<Vec<CachedProduct>> {
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(SyncError::Network("connection reset".into()));
            }
            Ok(self.products.lock().unwrap().clone())
        }

        async fn fetch_inventory(&self, _store_id: i64) -> SyncResult<Vec<CachedInventory>> {
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(SyncError::Network("connection reset".into()));
            }
            Ok(self.inventories.lock().unwrap().clone())
        }

        async fn create_sale_group(
            &self,
            request: &SaleGroupRequest,
        ) -> SyncResult<RemoteSaleGroup> {
            self.group_calls.fetch_add(1, Ordering::SeqCst);
            let id = {
                let mut groups = self.groups.lock().unwrap();
                let next = format!("grp-{}", groups.len() + 1);
                groups
                    .entry(request.client_ref.clone())
                    .or_insert(next)
                    .clone()
            };
            Ok(RemoteSaleGroup { id })
        }

        async fn create_sale_line(&self, request: &SaleLineRequest) -> SyncResult<RemoteSale> {
            if self.fail_lines.load(Ordering::SeqCst) {
                return Err(SyncError::Network("connection reset".into()));
            }
            Ok(RemoteSale {
                id: "sale-1".into(),
                sale_group_id: Some(request.sale_group_id.clone()),
            })
        }

        async fn check_device_already_sold(
            &self,
            device_id: &str,
            _store_id: i64,
        ) -> SyncResult<DeviceSoldCheck> {
            if self.fail_device_check.load(Ordering::SeqCst) {
                return Err(SyncError::Network("connection reset".into()));
            }
            let sold = self.sold_device.lock().unwrap();
            if sold.as_deref() == Some(device_id) {
                return Ok(DeviceSoldCheck {
                    already_sold: true,
                    sale: Some(RemoteSale {
                        id: "sale-remote".into(),
                        sale_group_id: None,
                    }),
                });
            }
            Ok(DeviceSoldCheck {
                already_sold: false,
                sale: None,
            })
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn candidate_line(product_id: &str, qty: i64, unit_cents: i64) -> CandidateLine {
        CandidateLine {
            product_id: product_id.to_string(),
            product_name: format!("Product {product_id}"),
            quantity: qty,
            unit_price_cents: unit_cents,
            device_ids: Vec::new(),
            device_sizes: Vec::new(),
            quantity_manual: false,
        }
    }

    fn candidate(lines: Vec<CandidateLine>) -> CandidateSale {
        CandidateSale {
            store_id: None, // resolved from the session by the manager
            lines,
            payment_method: "cash".to_string(),
            customer_id: None,
            email_receipt: false,
            total_override_cents: None,
        }
    }

    fn product(id: &str, devices: &[&str]) -> CachedProduct {
        CachedProduct {
            id: id.to_string(),
            store_id: 7,
            name: format!("Product {id}"),
            device_ids: devices.iter().map(|d| d.to_string()).collect(),
            device_sizes: devices.iter().map(|_| String::new()).collect(),
            price_cents: 500,
            cost_cents: None,
            cached_at: Utc::now(),
        }
    }

    fn inventory(product_id: &str, qty: i64) -> CachedInventory {
        CachedInventory {
            product_id: product_id.to_string(),
            store_id: 7,
            available_qty: qty,
            total_sold: 0,
            cached_at: Utc::now(),
        }
    }

    async fn setup(online: bool) -> (Arc<FlakyGateway>, OfflineCacheManager) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let gateway = Arc::new(FlakyGateway::default());
        let manager = OfflineCacheManager::new(
            SyncConfig::default(),
            db,
            SessionContext::new(Some(7), "u1", "o1", "clerk@example.com"),
            gateway.clone(),
            ConnectivityMonitor::new(online),
            Arc::new(NoOpSink),
        );
        (gateway, manager)
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test]
    async fn test_online_submit_syncs_immediately_and_decrements_inventory() {
        let (_gateway, manager) = setup(true).await;
        manager
            .db
            .inventories()
            .cache_inventories(&[inventory("p1", 3)])
            .await
            .unwrap();

        let outcome = manager
            .submit_sale(candidate(vec![candidate_line("p1", 2, 500)]))
            .await
            .unwrap();

        let SubmitOutcome::Synced {
            client_ref,
            server_sale_group_id,
        } = outcome
        else {
            panic!("expected immediate sync");
        };
        assert_eq!(server_sale_group_id, "grp-1");

        let record = manager
            .db
            .queue()
            .get_by_client_ref(&client_ref)
            .await
            .unwrap()
            .unwrap();
        assert!(record.synced);
        assert_eq!(manager.pending_count().await.unwrap(), 0);

        let inv = manager
            .db
            .inventories()
            .get_by_product("p1", 7)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inv.available_qty, 1);
        assert_eq!(inv.total_sold, 2);
    }

    /// Network death mid-submit: the sale stays queued under the SAME
    /// client_ref and the later replay reuses the group the first attempt
    /// created - exactly one remote group.
    #[tokio::test]
    async fn test_network_failure_falls_back_to_queue_with_same_client_ref() {
        let (gateway, manager) = setup(true).await;

        gateway.fail_lines.store(true, Ordering::SeqCst);
        let outcome = manager
            .submit_sale(candidate(vec![candidate_line("p1", 1, 500)]))
            .await
            .unwrap();
        let client_ref = outcome.client_ref().to_string();
        assert!(matches!(outcome, SubmitOutcome::Queued { .. }));
        assert_eq!(manager.pending_count().await.unwrap(), 1);

        // Connectivity recovered; a pass drains the queue.
        gateway.fail_lines.store(false, Ordering::SeqCst);
        let pass = manager.sync_all().await.unwrap();
        assert_eq!(pass.synced, 1);

        let record = manager
            .db
            .queue()
            .get_by_client_ref(&client_ref)
            .await
            .unwrap()
            .unwrap();
        assert!(record.synced);
        assert_eq!(record.server_sale_group_id.as_deref(), Some("grp-1"));
        // group creation was called twice but the backend kept one group
        assert_eq!(gateway.group_calls.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.groups.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_submit_queues_without_touching_the_gateway() {
        let (gateway, manager) = setup(false).await;

        let outcome = manager
            .submit_sale(candidate(vec![candidate_line("p1", 1, 500)]))
            .await
            .unwrap();

        assert!(matches!(outcome, SubmitOutcome::Queued { .. }));
        assert_eq!(gateway.group_calls.load(Ordering::SeqCst), 0);
        assert_eq!(manager.pending_count().await.unwrap(), 1);

        // offline sync pass is a harmless no-op
        let pass = manager.sync_all().await.unwrap();
        assert_eq!(pass, SyncOutcome::default());
        assert_eq!(manager.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_sale_persists_nothing() {
        let (_gateway, manager) = setup(true).await;
        manager
            .db
            .inventories()
            .cache_inventories(&[inventory("p1", 3)])
            .await
            .unwrap();

        let result = manager.submit_sale(candidate(vec![])).await;
        let Err(SyncError::Validation(problems)) = result else {
            panic!("expected validation failure");
        };
        assert!(!problems.is_empty());

        assert_eq!(manager.pending_count().await.unwrap(), 0);
        let inv = manager
            .db
            .inventories()
            .get_by_product("p1", 7)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inv.available_qty, 3, "no inventory side effect");
    }

    #[tokio::test]
    async fn test_missing_store_id_fails_before_persistence() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let manager = OfflineCacheManager::new(
            SyncConfig::default(),
            db,
            SessionContext::new(None, "u1", "o1", "clerk@example.com"),
            Arc::new(FlakyGateway::default()),
            ConnectivityMonitor::new(true),
            Arc::new(NoOpSink),
        );

        let result = manager
            .submit_sale(candidate(vec![candidate_line("p1", 1, 500)]))
            .await;
        assert!(matches!(result, Err(SyncError::MissingStoreId)));
    }

    #[tokio::test]
    async fn test_load_data_caches_online_and_serves_cache_offline() {
        let (gateway, manager) = setup(true).await;
        *gateway.products.lock().unwrap() = vec![product("p1", &["IMEI1"])];
        *gateway.inventories.lock().unwrap() = vec![inventory("p1", 5)];

        let (products, inventories) = manager.load_data().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(inventories.len(), 1);

        // Go offline with an emptier backend; the cache still serves.
        manager.connectivity.set_online(false);
        *gateway.products.lock().unwrap() = Vec::new();

        let (products, _) = manager.load_data().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "p1");
    }

    /// The monitor says online but the gateway dies mid-fetch: load_data
    /// degrades to the cache instead of returning empty (or erroring).
    #[tokio::test]
    async fn test_load_data_serves_cache_when_online_fetch_fails() {
        let (gateway, manager) = setup(true).await;
        *gateway.products.lock().unwrap() = vec![product("p1", &["IMEI1"])];
        *gateway.inventories.lock().unwrap() = vec![inventory("p1", 5)];

        // First load caches both datasets.
        manager.load_data().await.unwrap();

        gateway.fail_fetch.store(true, Ordering::SeqCst);
        assert!(manager.is_online());

        let (products, inventories) = manager.load_data().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "p1");
        assert_eq!(inventories.len(), 1);
        assert_eq!(inventories[0].available_qty, 5);
    }

    #[tokio::test]
    async fn test_pause_resume_and_clear_queue() {
        let (_gateway, manager) = setup(true).await;
        manager
            .submit_sale(candidate(vec![candidate_line("p1", 1, 500)]))
            .await
            .unwrap();
        manager.connectivity.set_online(false);
        manager
            .submit_sale(candidate(vec![candidate_line("p2", 1, 700)]))
            .await
            .unwrap();

        manager.pause_sync().await.unwrap();
        assert!(manager.is_paused().await.unwrap());
        manager.connectivity.set_online(true);
        assert_eq!(manager.sync_all().await.unwrap(), SyncOutcome::default());

        manager.resume_sync().await.unwrap();
        assert!(!manager.is_paused().await.unwrap());

        // one pending (the offline one); clearing deletes it but keeps
        // the synced record
        let deleted = manager.clear_queue().await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(manager.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_device_check_prefers_gateway_then_local_queue() {
        let (gateway, manager) = setup(true).await;
        *gateway.sold_device.lock().unwrap() = Some("IMEI9".to_string());

        let status = manager.check_device_already_sold("IMEI9").await.unwrap();
        assert_eq!(
            status,
            DeviceStatus::SoldRemotely {
                sale_id: "sale-remote".into()
            }
        );

        // Offline: a device inside a queued sale is reported from the
        // local queue.
        manager.connectivity.set_online(false);
        let mut line = candidate_line("p1", 1, 500);
        line.device_ids = vec!["IMEI5".to_string()];
        line.device_sizes = vec![String::new()];
        let outcome = manager.submit_sale(candidate(vec![line])).await.unwrap();

        let status = manager.check_device_already_sold("imei5").await.unwrap();
        assert_eq!(
            status,
            DeviceStatus::InPendingSale {
                client_ref: outcome.client_ref().to_string()
            }
        );

        let clear = manager.check_device_already_sold("IMEI7").await.unwrap();
        assert_eq!(clear, DeviceStatus::Available);
    }

    /// Padded or lowercased scans are normalized before either lookup, so
    /// `"  imei9  "` hits the same record as `"IMEI9"`.
    #[tokio::test]
    async fn test_device_check_normalizes_scanned_code() {
        let (gateway, manager) = setup(true).await;
        *gateway.sold_device.lock().unwrap() = Some("IMEI9".to_string());

        let status = manager
            .check_device_already_sold("  imei9  ")
            .await
            .unwrap();
        assert_eq!(
            status,
            DeviceStatus::SoldRemotely {
                sale_id: "sale-remote".into()
            }
        );

        // An all-whitespace scan matches nothing.
        let blank = manager.check_device_already_sold("   ").await.unwrap();
        assert_eq!(blank, DeviceStatus::Available);
    }

    /// A device check that dies on the network while online falls back to
    /// the local pending queue instead of erroring.
    #[tokio::test]
    async fn test_device_check_network_failure_falls_back_to_local_queue() {
        let (gateway, manager) = setup(false).await;

        let mut line = candidate_line("p1", 1, 500);
        line.device_ids = vec!["IMEI5".to_string()];
        line.device_sizes = vec![String::new()];
        let outcome = manager.submit_sale(candidate(vec![line])).await.unwrap();

        manager.connectivity.set_online(true);
        gateway.fail_device_check.store(true, Ordering::SeqCst);

        let status = manager.check_device_already_sold(" imei5 ").await.unwrap();
        assert_eq!(
            status,
            DeviceStatus::InPendingSale {
                client_ref: outcome.client_ref().to_string()
            }
        );

        let clear = manager.check_device_already_sold("IMEI8").await.unwrap();
        assert_eq!(clear, DeviceStatus::Available);
    }

    #[tokio::test]
    async fn test_auto_sync_runs_on_online_transition() {
        let (_gateway, manager) = setup(false).await;
        manager
            .submit_sale(candidate(vec![candidate_line("p1", 1, 500)]))
            .await
            .unwrap();
        assert_eq!(manager.pending_count().await.unwrap(), 1);

        let manager = Arc::new(manager);
        let _task = manager.spawn_auto_sync();

        manager.connectivity.set_online(true);

        // the pass runs on the spawned task; poll briefly
        for _ in 0..50 {
            if manager.pending_count().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(manager.pending_count().await.unwrap(), 0);
    }
}
