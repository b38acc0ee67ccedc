//! # Sale Model
//!
//! Queued sales, stored payload shapes, and legacy normalization.
//!
//! ## The Queue Entry Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       QueuedSale State Machine                          │
//! │                                                                         │
//! │  queue_sale()                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PENDING (synced=false) ──────attempt──────► SYNCED (synced=true)       │
//! │       ▲                                          │                      │
//! │       │ attempt failed:                          │ terminal:            │
//! │       │ sync_error + last_sync_attempt set       │ server_sale_group_id │
//! │       └──────────(retried on next pass)          │ set, record immutable│
//! │                                                                         │
//! │  Never auto-deleted on failure: records are retried or explicitly      │
//! │  cleared by the user.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Legacy Payload Shapes
//! Older clients wrote flat sale payloads (`{dynamic_product_id, quantity,
//! amount}`) with no `lines[]` array. Those records may still sit in queues
//! in the field, so the stored payload is modeled as an explicit tagged
//! union ([`StoredSale`]) with a single normalization function - the rest of
//! the codebase only ever sees the canonical lined shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Sale Line
// =============================================================================

/// A line item in a sale.
///
/// Product name and unit price are snapshots frozen at scan time, so a later
/// catalog change cannot alter a queued sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// Quantity sold (>= 1).
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Device identifiers sold on this line (serialized units only).
    #[serde(default)]
    pub device_ids: Vec<String>,
    /// Size labels, index-aligned with `device_ids`.
    #[serde(default)]
    pub device_sizes: Vec<String>,
}

impl SaleLine {
    /// Line total before overrides (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Stored Payload Shapes
// =============================================================================

/// The canonical multi-line sale payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LinedSale {
    pub lines: Vec<SaleLine>,
    /// Explicit total override in cents. When absent the total is the sum
    /// of line totals.
    #[serde(default)]
    pub total_cents: Option<i64>,
}

/// The legacy flat sale payload written by older clients.
///
/// One product, one quantity, one amount - no `lines[]` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LegacyFlatSale {
    pub dynamic_product_id: String,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: i64,
    /// Sale amount in cents. Older payloads used the bare key `amount`.
    #[serde(alias = "amount")]
    pub amount_cents: i64,
}

/// A stored sale payload in either of its two known shapes.
///
/// ## Why a tagged union?
/// Shape detection happens in exactly one place (serde's untagged
/// dispatch on the presence of `lines`), instead of "does this object have
/// property X" checks scattered across the codebase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredSale {
    Lined(LinedSale),
    Legacy(LegacyFlatSale),
}

impl StoredSale {
    /// Normalizes any stored shape into the canonical lined form.
    ///
    /// ## Legacy Mapping
    /// ```text
    /// {dynamic_product_id: P, quantity: Q, amount: A}
    ///        │
    ///        ▼
    /// LinedSale {
    ///     lines: [{product_id: P, quantity: Q, unit_price: A / Q}],
    ///     total_cents: Some(A),   ← override keeps the exact total even
    /// }                             when A does not divide evenly by Q
    /// ```
    ///
    /// This is the ONLY place the legacy shape is interpreted.
    pub fn into_lined(self) -> LinedSale {
        match self {
            StoredSale::Lined(lined) => lined,
            StoredSale::Legacy(flat) => {
                let quantity = flat.quantity.max(1);
                let unit_price_cents = flat.amount_cents / quantity;
                LinedSale {
                    lines: vec![SaleLine {
                        product_id: flat.dynamic_product_id,
                        product_name: flat.product_name.unwrap_or_default(),
                        quantity,
                        unit_price_cents,
                        device_ids: Vec::new(),
                        device_sizes: Vec::new(),
                    }],
                    total_cents: Some(flat.amount_cents),
                }
            }
        }
    }
}

// =============================================================================
// Queued Sale
// =============================================================================

/// A locally persisted, not-yet-confirmed sale awaiting network replay.
///
/// This is the most important entity in the system: it is the unit of
/// offline durability and the unit of idempotent replay.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QueuedSale {
    /// Process-generated unique identifier. Primary key locally and the
    /// idempotency token remotely. Generated once, at creation, and never
    /// regenerated.
    pub client_ref: String,

    /// Owning store (required, numeric).
    pub store_id: i64,

    /// Canonical sale lines (guaranteed non-legacy after load).
    pub lines: Vec<SaleLine>,

    /// Explicit total override in cents, when supplied by the caller.
    pub total_override_cents: Option<i64>,

    /// Payment method label (must be non-empty to submit).
    pub payment_method: String,

    /// Customer reference, when known.
    pub customer_id: Option<String>,

    /// Whether the customer asked for an email receipt.
    pub email_receipt: bool,

    /// False until the sync engine confirms remote acceptance.
    /// A sale with `synced=true` is immutable (terminal state).
    pub synced: bool,

    /// Remote sale-group id, set only after successful sync.
    pub server_sale_group_id: Option<String>,

    /// Last sync failure message; cleared on success.
    pub sync_error: Option<String>,

    /// When the last sync attempt ran; cleared on success.
    #[ts(as = "Option<String>")]
    pub last_sync_attempt: Option<DateTime<Utc>>,

    /// When the sale happened at the register.
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl QueuedSale {
    /// Creates a new pending queue entry with a fresh `client_ref`.
    pub fn new(
        store_id: i64,
        lines: Vec<SaleLine>,
        total_override_cents: Option<i64>,
        payment_method: String,
        customer_id: Option<String>,
        email_receipt: bool,
    ) -> Self {
        let now = Utc::now();
        QueuedSale {
            client_ref: Uuid::new_v4().to_string(),
            store_id,
            lines,
            total_override_cents,
            payment_method,
            customer_id,
            email_receipt,
            synced: false,
            server_sale_group_id: None,
            sync_error: None,
            last_sync_attempt: None,
            sold_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// The sum of line totals, ignoring any override.
    pub fn computed_total(&self) -> Money {
        self.lines.iter().map(SaleLine::line_total).sum()
    }

    /// The effective sale total: the explicit override when supplied,
    /// otherwise the computed sum.
    pub fn total(&self) -> Money {
        match self.total_override_cents {
            Some(cents) => Money::from_cents(cents),
            None => self.computed_total(),
        }
    }

    /// Checks replay eligibility: non-empty lines and a positive total.
    ///
    /// ## Returns
    /// * `Ok(())` - eligible for sync
    /// * `Err(CoreError::SaleNotSyncEligible)` - carries the reason; the
    ///   record is marked failed but never deleted
    pub fn sync_eligibility(&self) -> CoreResult<()> {
        let reason = if self.lines.is_empty() {
            "sale has no lines".to_string()
        } else if !self.total().is_positive() {
            format!("sale total {} must be positive", self.total())
        } else {
            return Ok(());
        };
        Err(CoreError::SaleNotSyncEligible {
            client_ref: self.client_ref.clone(),
            reason,
        })
    }

    /// The payload persisted in the queue (always the canonical shape).
    pub fn payload(&self) -> LinedSale {
        LinedSale {
            lines: self.lines.clone(),
            total_cents: self.total_override_cents,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_line_total() {
        assert_eq!(line("p1", 2, 500).line_total().cents(), 1000);
    }

    #[test]
    fn test_total_computed_from_lines() {
        // Two lines: qty 2 @ 500 + qty 1 @ 1000 = 2000
        let sale = QueuedSale::new(
            7,
            vec![line("p1", 2, 500), line("p2", 1, 1000)],
            None,
            "cash".to_string(),
            None,
            false,
        );
        assert_eq!(sale.total().cents(), 2000);
        assert!(sale.sync_eligibility().is_ok());
    }

    #[test]
    fn test_total_override_wins() {
        let sale = QueuedSale::new(
            7,
            vec![line("p1", 2, 500)],
            Some(900),
            "cash".to_string(),
            None,
            false,
        );
        assert_eq!(sale.computed_total().cents(), 1000);
        assert_eq!(sale.total().cents(), 900);
    }

    #[test]
    fn test_client_ref_unique_per_creation() {
        let a = QueuedSale::new(7, vec![line("p", 1, 100)], None, "cash".into(), None, false);
        let b = QueuedSale::new(7, vec![line("p", 1, 100)], None, "cash".into(), None, false);
        assert_ne!(a.client_ref, b.client_ref);
    }

    #[test]
    fn test_eligibility_rejects_empty_and_nonpositive() {
        let empty = QueuedSale::new(7, vec![], None, "cash".into(), None, false);
        let err = empty.sync_eligibility().unwrap_err();
        assert!(matches!(err, CoreError::SaleNotSyncEligible { ref client_ref, .. }
            if *client_ref == empty.client_ref));
        assert!(err.to_string().contains("no lines"));

        let zero = QueuedSale::new(7, vec![line("p", 1, 0)], None, "cash".into(), None, false);
        let err = zero.sync_eligibility().unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_stored_sale_parses_lined_shape() {
        let json = r#"{"lines":[{"product_id":"p1","product_name":"P","quantity":2,"unit_price_cents":500}],"total_cents":null}"#;
        let stored: StoredSale = serde_json::from_str(json).unwrap();
        let lined = stored.into_lined();
        assert_eq!(lined.lines.len(), 1);
        assert_eq!(lined.lines[0].quantity, 2);
        assert!(lined.lines[0].device_ids.is_empty());
    }

    #[test]
    fn test_stored_sale_parses_legacy_shape() {
        let json = r#"{"dynamic_product_id":"p9","quantity":3,"amount":1500}"#;
        let stored: StoredSale = serde_json::from_str(json).unwrap();
        assert!(matches!(stored, StoredSale::Legacy(_)));
    }

    /// Legacy normalization round-trip: the computed total of the
    /// normalized record equals the original flat amount.
    #[test]
    fn test_legacy_normalization_round_trip() {
        let flat = StoredSale::Legacy(LegacyFlatSale {
            dynamic_product_id: "p9".to_string(),
            product_name: None,
            quantity: 3,
            amount_cents: 1500,
        });

        let lined = flat.into_lined();
        assert_eq!(lined.lines.len(), 1);
        assert_eq!(lined.lines[0].product_id, "p9");
        assert_eq!(lined.lines[0].quantity, 3);
        assert_eq!(lined.lines[0].unit_price_cents, 500);
        assert_eq!(lined.total_cents, Some(1500));
    }

    /// The override keeps the exact amount even when it does not divide
    /// evenly across the quantity.
    #[test]
    fn test_legacy_normalization_uneven_amount() {
        let flat = StoredSale::Legacy(LegacyFlatSale {
            dynamic_product_id: "p9".to_string(),
            product_name: Some("Widget".to_string()),
            quantity: 2,
            amount_cents: 1501,
        });

        let lined = flat.into_lined();
        // unit price rounds down; the override carries the exact total
        assert_eq!(lined.lines[0].unit_price_cents, 750);
        assert_eq!(lined.total_cents, Some(1501));
    }

    #[test]
    fn test_legacy_zero_quantity_clamped() {
        let flat = StoredSale::Legacy(LegacyFlatSale {
            dynamic_product_id: "p9".to_string(),
            product_name: None,
            quantity: 0,
            amount_cents: 800,
        });

        let lined = flat.into_lined();
        assert_eq!(lined.lines[0].quantity, 1);
        assert_eq!(lined.total_cents, Some(800));
    }
}
