//! # swiftcheckout-core: Pure Checkout Logic for SwiftCheckout
//!
//! This crate is the **heart** of the offline-first checkout engine. It
//! contains all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     SwiftCheckout Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      Point-of-Sale UI                           │   │
//! │  │     Scan ──► Candidate Sale ──► Submit ──► Pending/Synced       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ swiftcheckout-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   sale    │  │  checkout │  │   │
//! │  │   │  Product  │  │   Money   │  │QueuedSale │  │ Candidate │  │   │
//! │  │   │ Inventory │  │  (cents)  │  │StoredSale │  │   Sale    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              swiftcheckout-db (Local Durable Store)             │   │
//! │  │           SQLite caches, sales queue, sync status               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Cached product/inventory types and sync status
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`sale`] - Queued sales, stored payload shapes, legacy normalization
//! - [`checkout`] - Candidate-sale form logic (scanning, merging, validation)
//! - [`validation`] - Field-level validation rules
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod money;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use swiftcheckout_core::Money` instead of
// `use swiftcheckout_core::money::Money`

pub use checkout::{CandidateLine, CandidateSale};
pub use error::{CheckoutError, CoreError, ValidationError};
pub use money::Money;
pub use sale::{LegacyFlatSale, LinedSale, QueuedSale, SaleLine, StoredSale};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Singleton key for the sync status record.
///
/// ## Why a constant?
/// The status record is a single-instance configuration object. The hardcoded
/// key lives in exactly one place; everything else receives the loaded record
/// by reference.
pub const SYNC_STATUS_ID: &str = "main";

/// Delimiter used by the hosted backend for serialized device-identifier
/// lists (`"IMEI1,IMEI2,IMEI3"`). Parsing trims whitespace per entry.
pub const DEVICE_ID_DELIMITER: char = ',';

/// Maximum lines allowed in a single candidate sale.
///
/// ## Business Reason
/// Prevents runaway checkouts and keeps replay payloads bounded.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;
