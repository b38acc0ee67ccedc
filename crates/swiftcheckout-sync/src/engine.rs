//! # Synchronization Engine
//!
//! Drains the offline sales queue against the remote gateway.
//!
//! ## The Replay Pass
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One Full Sync Pass                                 │
//! │                                                                         │
//! │   1. Offline or paused?  ──────────────► return {synced:0, failed:0}    │
//! │   2. Acquire the pass guard (try_lock) ► concurrent pass? bail out      │
//! │   3. Load pending records (synced=0), oldest first                      │
//! │      (legacy flat payloads were normalized to lines[] on read)          │
//! │   4. FOR EACH record:                                                   │
//! │      a. Re-check the pause flag  ──────► paused? stop HERE, keep        │
//! │      │                                   prior results                  │
//! │      b. Eligibility: lines non-empty, total > 0                         │
//! │      │     ineligible ────────────────► mark failed (never delete)     │
//! │      c. create_sale_group(client_ref)  ← IDEMPOTENT: a group that      │
//! │      │                                   already exists for this ref    │
//! │      │                                   is returned, not duplicated    │
//! │      d. create_sale_line × N                                            │
//! │      │     any line fails ────────────► partial failure: mark failed,  │
//! │      │                                   group NOT rolled back          │
//! │      e. All lines ok ─────────────────► mark synced, store group id,   │
//! │      │                                   clear error columns            │
//! │      f. Emit SyncProgress {current, total, synced, failed}              │
//! │   5. Stamp last_sync_at (whether or not anything synced)                │
//! │   6. Return aggregate {synced, failed}                                  │
//! │                                                                         │
//! │  State machine per record:                                             │
//! │    PENDING ──attempt──► SYNCED (terminal)                              │
//! │    PENDING ──attempt,failure──► PENDING (sync_error kept, retried on   │
//! │                                 the NEXT pass - no backoff here)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Retry policy: a permanently-failing record is retried on every explicit
//! or connectivity-triggered pass and never expires. There is no automatic
//! backoff; manual `sync_all` calls are the retry mechanism.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::events::{CheckoutEvent, CheckoutEventSink};
use crate::gateway::{SaleGroupRequest, SaleLineRequest, SalesGateway};
use swiftcheckout_core::error::CoreError;
use swiftcheckout_core::sale::QueuedSale;
use swiftcheckout_db::Database;

// =============================================================================
// Outcome & Progress Types
// =============================================================================

/// Aggregate result of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Records that transitioned to synced during this pass.
    pub synced: usize,
    /// Records attempted and failed (kept pending for the next pass).
    pub failed: usize,
}

/// Per-record progress, delivered over an explicit channel instead of an
/// optional callback parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncProgress {
    /// 1-based index of the record just processed.
    pub current: usize,
    /// Total records in this pass's snapshot.
    pub total: usize,
    /// Running synced count.
    pub synced: usize,
    /// Running failed count.
    pub failed: usize,
    /// The record just processed.
    pub client_ref: String,
}

// =============================================================================
// Sync Engine
// =============================================================================

/// The queue replay engine.
///
/// Owns the pass re-entrancy guard: a given queued sale is never processed
/// by two concurrent passes, no matter how fast connectivity flaps.
pub struct SyncEngine {
    db: Database,
    gateway: Arc<dyn SalesGateway>,
    events: Arc<dyn CheckoutEventSink>,
    /// Held for the duration of a pass. `try_lock` makes the guard
    /// non-blocking: a second caller bails out instead of queueing up.
    pass_guard: Mutex<()>,
    /// Mirrors the guard for cheap synchronous `is_syncing` reads.
    running: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        db: Database,
        gateway: Arc<dyn SalesGateway>,
        events: Arc<dyn CheckoutEventSink>,
    ) -> Self {
        SyncEngine {
            db,
            gateway,
            events,
            pass_guard: Mutex::new(()),
            running: AtomicBool::new(false),
        }
    }

    /// True while a pass is in flight.
    pub fn is_syncing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs one full sync pass for a store.
    ///
    /// ## Arguments
    /// * `store_id` - the store whose pending sales are replayed
    /// * `online` - current connectivity (the caller owns the monitor)
    /// * `progress` - optional per-record progress stream
    ///
    /// ## Returns
    /// * `Ok(SyncOutcome)` - aggregate counts; `{0, 0}` when offline/paused
    /// * `Err(SyncError::SyncInProgress)` - another pass holds the guard
    pub async fn sync_all(
        &self,
        store_id: i64,
        online: bool,
        progress: Option<mpsc::UnboundedSender<SyncProgress>>,
    ) -> SyncResult<SyncOutcome> {
        // Step 1: abort immediately when offline or paused.
        if !online {
            debug!("Sync pass skipped: offline");
            return Ok(SyncOutcome::default());
        }
        let status = self.db.sync_status().get_or_init().await?;
        if status.is_paused {
            debug!("Sync pass skipped: paused");
            return Ok(SyncOutcome::default());
        }

        // Step 2: re-entrancy guard. try_lock, never wait - a listener
        // storm must collapse into the one pass already running.
        let _guard = self
            .pass_guard
            .try_lock()
            .map_err(|_| SyncError::SyncInProgress)?;
        self.running.store(true, Ordering::SeqCst);

        let outcome = self.run_pass(store_id, progress).await;

        self.running.store(false, Ordering::SeqCst);
        outcome
    }

    /// The body of a pass, with the guard already held.
    async fn run_pass(
        &self,
        store_id: i64,
        progress: Option<mpsc::UnboundedSender<SyncProgress>>,
    ) -> SyncResult<SyncOutcome> {
        let queue = self.db.queue();
        let status_repo = self.db.sync_status();

        // Step 3: snapshot of pending records, oldest first. Legacy
        // payloads were already normalized on read.
        let pending = queue.get_pending(store_id).await?;
        let total = pending.len();
        info!(store_id, total, "Starting sync pass");

        let mut outcome = SyncOutcome::default();

        for (index, sale) in pending.iter().enumerate() {
            // Step 4a: mid-pass pause support. Stop processing further
            // records but keep prior results.
            let status = status_repo.get_or_init().await?;
            if status.is_paused {
                info!(
                    processed = index,
                    remaining = total - index,
                    "Sync pass paused mid-pass"
                );
                break;
            }

            match self.replay_record(sale).await {
                Ok(group_id) => {
                    // Step 4e: terminal success.
                    queue.mark_synced(&sale.client_ref, &group_id).await?;
                    outcome.synced += 1;
                    self.events.emit(CheckoutEvent::SaleSynced {
                        client_ref: sale.client_ref.clone(),
                        server_sale_group_id: group_id,
                    });
                }
                Err(err) => {
                    // Step 4b/4d: record kept pending with the specific
                    // error; retried on the next pass.
                    warn!(client_ref = %sale.client_ref, %err, "Sale replay failed");
                    queue.mark_failed(&sale.client_ref, &err.to_string()).await?;
                    outcome.failed += 1;
                    self.events.emit(CheckoutEvent::SaleSyncFailed {
                        client_ref: sale.client_ref.clone(),
                        error: err.to_string(),
                    });
                }
            }

            // Step 4f: per-record progress.
            if let Some(tx) = &progress {
                let _ = tx.send(SyncProgress {
                    current: index + 1,
                    total,
                    synced: outcome.synced,
                    failed: outcome.failed,
                    client_ref: sale.client_ref.clone(),
                });
            }
        }

        // Step 5: stamp the pass, successful or not.
        status_repo.stamp_last_sync(Utc::now()).await?;

        info!(
            synced = outcome.synced,
            failed = outcome.failed,
            "Sync pass complete"
        );
        Ok(outcome)
    }

    /// Replays one queued sale: eligibility, idempotent group creation,
    /// then one remote line per local line.
    ///
    /// ## Returns
    /// The remote sale-group id on full success.
    async fn replay_record(&self, sale: &QueuedSale) -> SyncResult<String> {
        // Step 4b: reject, never delete.
        sale.sync_eligibility().map_err(|err| {
            let reason = match err {
                CoreError::SaleNotSyncEligible { reason, .. } => reason,
                other => other.to_string(),
            };
            SyncError::NotEligible {
                client_ref: sale.client_ref.clone(),
                reason,
            }
        })?;

        // Step 4c: idempotent on client_ref. If a previous attempt created
        // the group and then died, this returns the SAME group.
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

        // Step 4d: one remote line per queued line. The group is not
        // rolled back on line failure.
        let mut failed_lines = 0usize;
        let mut last_error: Option<SyncError> = None;

        for line in &sale.lines {
            let result = self
                .gateway
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
                .await;

            if let Err(err) = result {
                failed_lines += 1;
                last_error = Some(err);
            }
        }

        if failed_lines > 0 {
            return Err(SyncError::PartialFailure {
                client_ref: sale.client_ref.clone(),
                group_id: group.id,
                failed_lines,
                message: last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            });
        }

        Ok(group.id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoOpSink;
    use crate::gateway::{DeviceSoldCheck, RemoteSale, RemoteSaleGroup};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use swiftcheckout_core::sale::SaleLine;
    use swiftcheckout_db::{Database, DbConfig, SyncStatusRepository};

    // =========================================================================
    // Gateway Double
    // =========================================================================

    /// In-process gateway double with idempotent group creation keyed on
    /// client_ref, matching the backend contract.
    #[derive(Default)]
    struct MockGateway {
        /// client_ref → group id (the idempotency table).
        groups: StdMutex<HashMap<String, String>>,
        group_calls: AtomicUsize,
        line_calls: AtomicUsize,
        /// Product ids whose line creation fails.
        failing_products: StdMutex<HashSet<String>>,
        /// Last group request seen (for total assertions).
        last_group_request: StdMutex<Option<SaleGroupRequest>>,
        /// Flips the pause flag after this many group creations.
        pause_after_groups: StdMutex<Option<(usize, SyncStatusRepository)>>,
        /// Per-call artificial latency.
        latency: Option<Duration>,
    }

    impl MockGateway {
        fn fail_product(&self, product_id: &str) {
            self.failing_products
                .lock()
                .unwrap()
                .insert(product_id.to_string());
        }

        fn clear_failures(&self) {
            self.failing_products.lock().unwrap().clear();
        }

        fn pause_after(&self, n: usize, repo: SyncStatusRepository) {
            *self.pause_after_groups.lock().unwrap() = Some((n, repo));
        }

        fn group_count(&self) -> usize {
            self.groups.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SalesGateway for MockGateway {
        async fn fetch_products(
            &self,
            _store_id: i64,
        ) -> SyncResult<Vec<swiftcheckout_core::types::CachedProduct>> {
            Ok(Vec::new())
        }

        async fn fetch_inventory(
            &self,
            _store_id: i64,
        ) -> SyncResult<Vec<swiftcheckout_core::types::CachedInventory>> {
            Ok(Vec::new())
        }

        async fn create_sale_group(
            &self,
            request: &SaleGroupRequest,
        ) -> SyncResult<RemoteSaleGroup> {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            let calls = self.group_calls.fetch_add(1, Ordering::SeqCst) + 1;

            *self.last_group_request.lock().unwrap() = Some(request.clone());

            // Idempotent: an existing ref returns the existing group.
            let id = {
                let mut groups = self.groups.lock().unwrap();
                let next = format!("grp-{}", groups.len() + 1);
                groups.entry(request.client_ref.clone()).or_insert(next).clone()
            };

            // Simulate an operator hitting pause while the pass runs.
            let pause = self.pause_after_groups.lock().unwrap().clone();
            if let Some((after, repo)) = pause {
                if calls >= after {
                    repo.set_paused(true).await.map_err(SyncError::from)?;
                }
            }

            Ok(RemoteSaleGroup { id })
        }

        async fn create_sale_line(&self, request: &SaleLineRequest) -> SyncResult<RemoteSale> {
            self.line_calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failing_products
                .lock()
                .unwrap()
                .contains(&request.product_id)
            {
                return Err(SyncError::Network("simulated line failure".into()));
            }
            Ok(RemoteSale {
                id: format!("sale-{}", self.line_calls.load(Ordering::SeqCst)),
                sale_group_id: Some(request.sale_group_id.clone()),
            })
        }

        async fn check_device_already_sold(
            &self,
            _device_id: &str,
            _store_id: i64,
        ) -> SyncResult<DeviceSoldCheck> {
            Ok(DeviceSoldCheck {
                already_sold: false,
                sale: None,
            })
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn line(product_id: &str, qty: i64, unit_cents: i64) -> SaleLine {
        SaleLine {
            product_id: product_id.to_string(),
            product_name: format!("Product {product_id}"),
            quantity: qty,
            unit_price_cents: unit_cents,
            device_ids: Vec::new(),
            device_sizes: Vec::new(),
        }
    }

    fn sale(lines: Vec<SaleLine>) -> QueuedSale {
        QueuedSale::new(7, lines, None, "cash".to_string(), None, false)
    }

    async fn setup() -> (Database, Arc<MockGateway>, SyncEngine) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let gateway = Arc::new(MockGateway::default());
        let engine = SyncEngine::new(db.clone(), gateway.clone(), Arc::new(NoOpSink));
        (db, gateway, engine)
    }

    // =========================================================================
    // Tests
    // =========================================================================

    /// Full happy path: two lines (qty 2 @ 500, qty 1 @ 1000), no explicit
    /// total. The engine computes 2000 cents and the record ends terminal.
    #[tokio::test]
    async fn test_full_pass_computes_total_and_marks_synced() {
        let (db, gateway, engine) = setup().await;

        let queued = sale(vec![line("p1", 2, 500), line("p2", 1, 1000)]);
        db.queue().insert(&queued).await.unwrap();

        let outcome = engine.sync_all(7, true, None).await.unwrap();
        assert_eq!(outcome, SyncOutcome { synced: 1, failed: 0 });

        let request = gateway.last_group_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.total_amount, 2000);
        assert_eq!(request.client_ref, queued.client_ref);

        let record = db
            .queue()
            .get_by_client_ref(&queued.client_ref)
            .await
            .unwrap()
            .unwrap();
        assert!(record.synced);
        assert_eq!(record.server_sale_group_id.as_deref(), Some("grp-1"));
        assert!(record.sync_error.is_none());

        // pass stamped last_sync_at
        let status = db.sync_status().get_or_init().await.unwrap();
        assert!(status.last_sync_at.is_some());
    }

    /// Replay after partial failure: the group is created on the first
    /// attempt, a line fails, and the retry reuses the SAME remote group -
    /// exactly one group ever exists for the client_ref.
    #[tokio::test]
    async fn test_idempotent_replay_after_partial_failure() {
        let (db, gateway, engine) = setup().await;

        let queued = sale(vec![line("p1", 1, 500), line("p2", 1, 700)]);
        db.queue().insert(&queued).await.unwrap();

        // First pass: line p2 fails after the group was created.
        gateway.fail_product("p2");
        let outcome = engine.sync_all(7, true, None).await.unwrap();
        assert_eq!(outcome, SyncOutcome { synced: 0, failed: 1 });

        let record = db
            .queue()
            .get_by_client_ref(&queued.client_ref)
            .await
            .unwrap()
            .unwrap();
        assert!(!record.synced);
        let error = record.sync_error.unwrap();
        assert!(error.contains("grp-1"), "partial failure names the group: {error}");
        assert!(record.last_sync_attempt.is_some());

        // Retry: backend recovered. Same client_ref, same group.
        gateway.clear_failures();
        let outcome = engine.sync_all(7, true, None).await.unwrap();
        assert_eq!(outcome, SyncOutcome { synced: 1, failed: 0 });

        assert_eq!(gateway.group_calls.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.group_count(), 1, "no duplicate remote group");

        let record = db
            .queue()
            .get_by_client_ref(&queued.client_ref)
            .await
            .unwrap()
            .unwrap();
        assert!(record.synced);
        assert_eq!(record.server_sale_group_id.as_deref(), Some("grp-1"));
    }

    /// Pausing after record k stops the pass with exactly k synced and the
    /// rest untouched: still pending, no sync_error (never attempted).
    #[tokio::test]
    async fn test_pause_mid_pass_keeps_prior_results() {
        let (db, gateway, engine) = setup().await;

        let mut refs = Vec::new();
        for i in 0..3 {
            let mut s = sale(vec![line(&format!("p{i}"), 1, 500)]);
            s.created_at = Utc::now() + chrono::Duration::seconds(i);
            db.queue().insert(&s).await.unwrap();
            refs.push(s.client_ref);
        }

        // Operator pauses while record 1 is in flight.
        gateway.pause_after(1, db.sync_status());

        let outcome = engine.sync_all(7, true, None).await.unwrap();
        assert_eq!(outcome, SyncOutcome { synced: 1, failed: 0 });

        let first = db.queue().get_by_client_ref(&refs[0]).await.unwrap().unwrap();
        assert!(first.synced);

        for skipped_ref in &refs[1..] {
            let record = db
                .queue()
                .get_by_client_ref(skipped_ref)
                .await
                .unwrap()
                .unwrap();
            assert!(!record.synced);
            assert!(record.sync_error.is_none(), "skipped records were never attempted");
        }
    }

    #[tokio::test]
    async fn test_offline_and_paused_abort_immediately() {
        let (db, gateway, engine) = setup().await;
        db.queue().insert(&sale(vec![line("p1", 1, 500)])).await.unwrap();

        // offline
        let outcome = engine.sync_all(7, false, None).await.unwrap();
        assert_eq!(outcome, SyncOutcome::default());
        assert_eq!(gateway.group_calls.load(Ordering::SeqCst), 0);

        // paused before start
        db.sync_status().set_paused(true).await.unwrap();
        let outcome = engine.sync_all(7, true, None).await.unwrap();
        assert_eq!(outcome, SyncOutcome::default());
        assert_eq!(gateway.group_calls.load(Ordering::SeqCst), 0);
    }

    /// A zero-total record is marked failed and kept, and does not stop
    /// the rest of the pass.
    #[tokio::test]
    async fn test_ineligible_record_marked_failed_not_deleted() {
        let (db, _gateway, engine) = setup().await;

        let mut bad = sale(vec![line("p1", 1, 0)]);
        bad.created_at = Utc::now() - chrono::Duration::seconds(5);
        let good = sale(vec![line("p2", 1, 500)]);
        db.queue().insert(&bad).await.unwrap();
        db.queue().insert(&good).await.unwrap();

        let outcome = engine.sync_all(7, true, None).await.unwrap();
        assert_eq!(outcome, SyncOutcome { synced: 1, failed: 1 });

        let record = db
            .queue()
            .get_by_client_ref(&bad.client_ref)
            .await
            .unwrap()
            .unwrap();
        assert!(!record.synced);
        assert!(record.sync_error.unwrap().contains("positive"));
    }

    #[tokio::test]
    async fn test_progress_stream_per_record() {
        let (db, _gateway, engine) = setup().await;
        for i in 0..2 {
            db.queue()
                .insert(&sale(vec![line(&format!("p{i}"), 1, 500)]))
                .await
                .unwrap();
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.sync_all(7, true, Some(tx)).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!((first.current, first.total), (1, 2));
        let second = rx.recv().await.unwrap();
        assert_eq!((second.current, second.total), (2, 2));
        assert_eq!(second.synced, 2);
        assert!(rx.recv().await.is_none());
    }

    /// Two overlapping sync_all calls: the second bails out with
    /// SyncInProgress instead of replaying the same records.
    #[tokio::test]
    async fn test_reentrancy_guard_rejects_concurrent_pass() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let gateway = Arc::new(MockGateway {
            latency: Some(Duration::from_millis(200)),
            ..MockGateway::default()
        });
        let engine = Arc::new(SyncEngine::new(
            db.clone(),
            gateway.clone(),
            Arc::new(NoOpSink),
        ));

        db.queue().insert(&sale(vec![line("p1", 1, 500)])).await.unwrap();

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.sync_all(7, true, None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(engine.is_syncing());

        let second = engine.sync_all(7, true, None).await;
        assert!(matches!(second, Err(SyncError::SyncInProgress)));

        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome, SyncOutcome { synced: 1, failed: 0 });
        assert!(!engine.is_syncing());
        // the sale was replayed exactly once
        assert_eq!(gateway.group_calls.load(Ordering::SeqCst), 1);
    }
}
