//! # Checkout Event Sink
//!
//! User-facing notifications for queue/sync state transitions.
//!
//! Every transition produces a DISTINCT event with specific text; generic
//! "something went wrong" messages are banned. The UI decides how to render
//! them (toast, badge, status line) - this module only defines the stream.

use swiftcheckout_core::Money;

/// A queue/sync state transition the user should hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutEvent {
    /// A sale was durably queued (offline or as an online fallback).
    SaleQueued { client_ref: String, total: Money },

    /// A queued sale was confirmed remotely.
    SaleSynced {
        client_ref: String,
        server_sale_group_id: String,
    },

    /// A replay attempt failed; the sale stays queued.
    SaleSyncFailed { client_ref: String, error: String },

    /// Sync was paused; running passes stop between records.
    SyncPaused,

    /// Sync was resumed.
    SyncResumed,

    /// Pending sales were deleted at the user's request.
    QueueCleared { deleted: u64 },

    /// Product/inventory caches were refreshed from the gateway.
    DataRefreshed { products: u64, inventories: u64 },
}

impl CheckoutEvent {
    /// Operation-specific notification text.
    pub fn message(&self) -> String {
        match self {
            CheckoutEvent::SaleQueued { total, .. } => {
                format!("Sale of {total} saved offline, will sync when online")
            }
            CheckoutEvent::SaleSynced {
                server_sale_group_id,
                ..
            } => format!("Sale synced (group {server_sale_group_id})"),
            CheckoutEvent::SaleSyncFailed { error, .. } => {
                format!("Sale sync failed: {error}. Will retry on the next sync.")
            }
            CheckoutEvent::SyncPaused => "Sync paused".to_string(),
            CheckoutEvent::SyncResumed => "Sync resumed".to_string(),
            CheckoutEvent::QueueCleared { deleted } => {
                format!("Cleared {deleted} pending sale(s)")
            }
            CheckoutEvent::DataRefreshed {
                products,
                inventories,
            } => format!("Refreshed {products} products and {inventories} inventory records"),
        }
    }
}

/// Sink for checkout events.
///
/// Implementations must be fast and non-blocking (called from the sync
/// loop). The UI layer typically forwards these over its own channel.
pub trait CheckoutEventSink: Send + Sync {
    fn emit(&self, event: CheckoutEvent);
}

/// Sink that drops all events (tests, headless tools).
#[derive(Debug, Clone, Default)]
pub struct NoOpSink;

impl CheckoutEventSink for NoOpSink {
    fn emit(&self, _event: CheckoutEvent) {}
}
