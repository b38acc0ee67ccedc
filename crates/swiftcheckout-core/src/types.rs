//! # Domain Types
//!
//! Cached-record types used throughout SwiftCheckout.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Cached Records                                  │
//! │                                                                         │
//! │  ┌───────────────────┐   ┌───────────────────┐   ┌──────────────────┐  │
//! │  │  CachedProduct    │   │ CachedInventory   │   │ SyncStatusRecord │  │
//! │  │  ───────────────  │   │  ───────────────  │   │  ──────────────  │  │
//! │  │  id + store_id    │   │  product_id       │   │  id = "main"     │  │
//! │  │  name             │   │  store_id         │   │  is_paused       │  │
//! │  │  device_ids[]     │   │  available_qty    │   │  last_sync_at    │  │
//! │  │  device_sizes[]   │   │  total_sold       │   └──────────────────┘  │
//! │  │  price_cents      │   └───────────────────┘                         │
//! │  └───────────────────┘                                                 │
//! │                                                                         │
//! │  Lifecycle: refreshed from the remote gateway whenever online,         │
//! │  persisted locally for offline reads, never independently mutated      │
//! │  by the client except on bulk re-cache (and the inventory's local      │
//! │  optimistic decrement).                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::DEVICE_ID_DELIMITER;

// =============================================================================
// Device List Parsing
// =============================================================================

/// Parses a delimited device-identifier string into a normalized list.
///
/// ## Rules
/// - Split on the backend's delimiter (`,`)
/// - Trim whitespace per entry
/// - Drop entries that are empty after trimming
///
/// ## Example
/// ```rust
/// use swiftcheckout_core::types::parse_device_ids;
///
/// let ids = parse_device_ids(" IMEI1, IMEI2 ,,IMEI3 ");
/// assert_eq!(ids, vec!["IMEI1", "IMEI2", "IMEI3"]);
/// ```
pub fn parse_device_ids(raw: &str) -> Vec<String> {
    raw.split(DEVICE_ID_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses a delimited size-label string, preserving empty entries.
///
/// Unlike [`parse_device_ids`], empty slots are kept: the size list is
/// positional and must stay index-aligned with the device list.
pub fn parse_device_sizes(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(DEVICE_ID_DELIMITER)
        .map(|s| s.trim().to_string())
        .collect()
}

// =============================================================================
// Cached Product
// =============================================================================

/// A product cached from the remote gateway for offline reads.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CachedProduct {
    /// Product identifier assigned by the backend.
    pub id: String,

    /// Store this cache entry belongs to.
    pub store_id: i64,

    /// Display name shown to the cashier and on receipts.
    pub name: String,

    /// Unique per-unit device identifiers (serial/IMEI), parsed from the
    /// backend's delimited form.
    pub device_ids: Vec<String>,

    /// Per-device size labels, index-aligned with `device_ids`.
    /// Missing entries default to empty strings.
    pub device_sizes: Vec<String>,

    /// Sale price in cents.
    pub price_cents: i64,

    /// Cost in cents (for margin reporting; optional).
    pub cost_cents: Option<i64>,

    /// When this entry was last re-cached from the gateway.
    #[ts(as = "String")]
    pub cached_at: DateTime<Utc>,
}

impl CachedProduct {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the size label for a device index, empty when absent.
    ///
    /// Invariant: device-identifier and size lists are index-aligned; a
    /// shorter size list means the missing tail defaults to "".
    pub fn size_for(&self, index: usize) -> &str {
        self.device_sizes.get(index).map(String::as_str).unwrap_or("")
    }

    /// Checks whether a normalized code matches one of this product's
    /// device identifiers (case-insensitive), and returns its index.
    pub fn device_index(&self, normalized_code: &str) -> Option<usize> {
        self.device_ids
            .iter()
            .position(|id| id.eq_ignore_ascii_case(normalized_code))
    }

    /// Pads the size list with empty strings up to the device-list length.
    ///
    /// Called after parsing gateway data so the alignment invariant holds
    /// no matter how ragged the serialized form was.
    pub fn align_sizes(&mut self) {
        while self.device_sizes.len() < self.device_ids.len() {
            self.device_sizes.push(String::new());
        }
        self.device_sizes.truncate(self.device_ids.len());
    }
}

// =============================================================================
// Cached Inventory
// =============================================================================

/// An inventory level cached per (product, store).
///
/// Mutated by three actors only:
/// (a) server refresh, (b) local optimistic decrement when an offline sale
/// is queued, (c) the sync engine after a queued sale is confirmed remotely.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CachedInventory {
    pub product_id: String,
    pub store_id: i64,
    /// Units available for sale. Never negative: local decrements floor at
    /// zero.
    pub available_qty: i64,
    /// Cumulative units sold.
    pub total_sold: i64,
    #[ts(as = "String")]
    pub cached_at: DateTime<Utc>,
}

// =============================================================================
// Sync Status
// =============================================================================

/// The singleton sync-status record (`id = "main"`).
///
/// Created lazily with defaults on first access; mutated by pause/resume
/// actions and stamped after every sync pass.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncStatusRecord {
    pub id: String,
    /// While true, sync passes refuse to start and a running pass stops
    /// between records.
    pub is_paused: bool,
    /// When the last pass finished (set whether or not anything synced).
    #[ts(as = "Option<String>")]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl Default for SyncStatusRecord {
    fn default() -> Self {
        SyncStatusRecord {
            id: crate::SYNC_STATUS_ID.to_string(),
            is_paused: false,
            last_sync_at: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
