//! # Checkout Form Logic
//!
//! Transforms raw scan/manual input into a validated candidate sale.
//!
//! ## The Scan Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scan → Candidate Sale                            │
//! │                                                                         │
//! │  raw code                                                               │
//! │     │ normalize_barcode (trim + uppercase)                              │
//! │     ▼                                                                   │
//! │  barcode lookup (db, outside this crate)                                │
//! │     │ CachedProduct                                                     │
//! │     ▼                                                                   │
//! │  duplicate check ── already in ANY line? ──► CheckoutError::Duplicate   │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  already-sold check (gateway/cache, outside this crate)                 │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  line merge ── open line for same product name?                         │
//! │     ├── yes: append device, auto-derive qty (unless manual latch)       │
//! │     └── no:  open a new line                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is pure: the async "already sold" lookup and the barcode
//! resolution happen in the manager; this module only mutates the in-memory
//! candidate sale and enforces its invariants.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CheckoutError, CoreError, CoreResult};
use crate::money::Money;
use crate::sale::{QueuedSale, SaleLine};
use crate::types::CachedProduct;
use crate::{validation, MAX_SALE_LINES};

// =============================================================================
// Barcode Normalization
// =============================================================================

/// Normalizes a scanned code: trim whitespace, uppercase.
///
/// Empty-after-trim is rejected as an invalid barcode. All device
/// comparisons in the codebase operate on normalized codes, which is what
/// makes duplicate detection case-insensitive.
pub fn normalize_barcode(raw: &str) -> Result<String, CheckoutError> {
    let normalized = raw.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(CheckoutError::InvalidBarcode);
    }
    Ok(normalized)
}

// =============================================================================
// Candidate Line
// =============================================================================

/// A line in the in-progress (not yet submitted) sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CandidateLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Normalized device identifiers scanned into this line.
    pub device_ids: Vec<String>,
    /// Size labels, index-aligned with `device_ids`.
    pub device_sizes: Vec<String>,
    /// Once the user types a quantity by hand, auto-derivation from the
    /// device count stops PERMANENTLY for this line.
    pub quantity_manual: bool,
}

impl CandidateLine {
    fn from_product(product: &CachedProduct) -> Self {
        CandidateLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity: 0,
            unit_price_cents: product.price_cents,
            device_ids: Vec::new(),
            device_sizes: Vec::new(),
            quantity_manual: false,
        }
    }

    /// Line total at the current quantity.
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    fn into_sale_line(self) -> SaleLine {
        SaleLine {
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            device_ids: self.device_ids,
            device_sizes: self.device_sizes,
        }
    }
}

// =============================================================================
// Candidate Sale
// =============================================================================

/// The in-progress sale being built at the register.
///
/// Owns the line list, the duplicate-device invariant, and the
/// quantity-latch behavior. Converted into a [`QueuedSale`] by
/// [`CandidateSale::build`] once validation passes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CandidateSale {
    /// Resolved from the session context; a sale cannot be submitted
    /// without one.
    pub store_id: Option<i64>,
    pub lines: Vec<CandidateLine>,
    pub payment_method: String,
    pub customer_id: Option<String>,
    pub email_receipt: bool,
    /// Explicit total override in cents, when the cashier adjusts the total.
    pub total_override_cents: Option<i64>,
}

impl CandidateSale {
    pub fn new(store_id: Option<i64>) -> Self {
        CandidateSale {
            store_id,
            ..Default::default()
        }
    }

    /// Finds a normalized device identifier anywhere in the sale.
    ///
    /// Returns the owning line index. Comparison is case-insensitive
    /// because both sides are normalized, but we compare ignoring case
    /// anyway in case a line was populated from un-normalized cache data.
    pub fn find_device(&self, normalized_code: &str) -> Option<usize> {
        self.lines.iter().position(|line| {
            line.device_ids
                .iter()
                .any(|id| id.eq_ignore_ascii_case(normalized_code))
        })
    }

    /// Adds a scanned device to the sale.
    ///
    /// ## Arguments
    /// * `product` - the product the code resolved to
    /// * `raw_code` - the scanned code as typed/scanned (normalized here)
    ///
    /// ## Returns
    /// The index of the line the device landed on.
    ///
    /// ## Behavior
    /// 1. Rejects a device already present in ANY line (user-facing
    ///    warning, the sale stays intact).
    /// 2. Merges into an open line for the same product name instead of
    ///    opening a duplicate line.
    /// 3. Auto-derives quantity from the device count, unless the user
    ///    has manually set a quantity for that line (the latch), in which
    ///    case quantity is left untouched while the device list still grows.
    pub fn add_scanned_device(
        &mut self,
        product: &CachedProduct,
        raw_code: &str,
    ) -> CoreResult<usize> {
        let code = normalize_barcode(raw_code)?;

        if let Some(line) = self.find_device(&code) {
            return Err(CheckoutError::DuplicateDevice {
                device_id: code,
                line,
            }
            .into());
        }

        let size = product
            .device_index(&code)
            .map(|i| product.size_for(i).to_string())
            .unwrap_or_default();

        // Merge by product name: the register shows one line per product.
        let index = match self
            .lines
            .iter()
            .position(|line| line.product_name == product.name)
        {
            Some(index) => index,
            None => {
                if self.lines.len() >= MAX_SALE_LINES {
                    return Err(CoreError::SaleTooLarge {
                        max: MAX_SALE_LINES,
                    });
                }
                self.lines.push(CandidateLine::from_product(product));
                self.lines.len() - 1
            }
        };

        let line = &mut self.lines[index];
        line.device_ids.push(code);
        line.device_sizes.push(size);
        if !line.quantity_manual {
            line.quantity = line.device_ids.len() as i64;
        }
        Ok(index)
    }

    /// Sets a manual quantity on a line and latches auto-derivation off.
    ///
    /// The latch is permanent for the line: subsequent scans keep growing
    /// the device list but never touch the quantity again.
    pub fn set_manual_quantity(&mut self, line: usize, quantity: i64) -> CoreResult<()> {
        let line = self
            .lines
            .get_mut(line)
            .ok_or(CheckoutError::NoSuchLine(line))?;
        validation::validate_quantity(quantity)?;
        line.quantity = quantity;
        line.quantity_manual = true;
        Ok(())
    }

    /// Removes a line from the sale.
    pub fn remove_line(&mut self, index: usize) -> CoreResult<CandidateLine> {
        if index >= self.lines.len() {
            return Err(CheckoutError::NoSuchLine(index).into());
        }
        Ok(self.lines.remove(index))
    }

    /// The effective total: explicit override when set, sum of lines
    /// otherwise.
    pub fn total(&self) -> Money {
        match self.total_override_cents {
            Some(cents) => Money::from_cents(cents),
            None => self.lines.iter().map(CandidateLine::line_total).sum(),
        }
    }

    /// Validates the sale for submission, collecting ALL violations.
    ///
    /// ## Returns
    /// A list of human-readable messages, empty when the sale is valid.
    /// The caller reports the whole list, not just the first problem.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let Err(e) = validation::validate_store_id(self.store_id) {
            problems.push(e.to_string());
        }
        if let Err(e) = validation::validate_line_count(self.lines.len()) {
            problems.push(e.to_string());
        }
        for (i, line) in self.lines.iter().enumerate() {
            if line.product_id.trim().is_empty() {
                problems.push(format!("line {i} has no resolved product"));
            }
            if let Err(e) = validation::validate_quantity(line.quantity) {
                problems.push(format!("line {i}: {e}"));
            }
        }
        if let Err(e) = validation::validate_payment_method(&self.payment_method) {
            problems.push(e.to_string());
        }
        if let Err(e) = validation::validate_total_cents(self.total().cents()) {
            problems.push(e.to_string());
        }

        problems
    }

    /// Validates and converts the candidate into a pending [`QueuedSale`].
    ///
    /// ## Returns
    /// * `Ok(QueuedSale)` - with a fresh `client_ref`, `synced=false`, and
    ///   timestamps stamped now
    /// * `Err(problems)` - the full violation list; nothing is consumed
    pub fn build(&self) -> Result<QueuedSale, Vec<String>> {
        let problems = self.validate();
        if !problems.is_empty() {
            return Err(problems);
        }

        // validate_store_id already passed
        let store_id = self.store_id.unwrap_or_default();
        Ok(QueuedSale::new(
            store_id,
            self.lines
                .iter()
                .cloned()
                .map(CandidateLine::into_sale_line)
                .collect(),
            self.total_override_cents,
            self.payment_method.clone(),
            self.customer_id.clone(),
            self.email_receipt,
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
