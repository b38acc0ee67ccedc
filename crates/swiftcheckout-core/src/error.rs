//! # Error Types
//!
//! Domain-specific error types for swiftcheckout-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  swiftcheckout-core errors (this file)                                 │
//! │  ├── CoreError        - General domain errors                          │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── CheckoutError    - Scan/form failures surfaced to the cashier     │
//! │                                                                         │
//! │  swiftcheckout-db errors (separate crate)                              │
//! │  └── DbError          - Local storage failures                         │
//! │                                                                         │
//! │  swiftcheckout-sync errors (separate crate)                            │
//! │  └── SyncError        - Gateway/connectivity/replay failures           │
//! │                                                                         │
//! │  Flow: CheckoutError → CoreError → DbError/SyncError → UI              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (device id, client_ref, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a specific user-facing message -
//!    generic "something went wrong" text is banned

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A queued sale failed eligibility checks for replay.
    ///
    /// ## When This Occurs
    /// - Computed total is zero or negative
    /// - No lines remain after legacy normalization
    #[error("Sale {client_ref} is not eligible for sync: {reason}")]
    SaleNotSyncEligible { client_ref: String, reason: String },

    /// Candidate sale has exceeded maximum allowed lines.
    #[error("Sale cannot have more than {max} lines")]
    SaleTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Checkout form error (wraps CheckoutError).
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Errors raised by the checkout form logic, surfaced to the cashier.
///
/// ## Severity
/// None of these are fatal: the candidate sale stays intact and the cashier
/// corrects the input. They are warnings with specific text, never silently
/// swallowed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Scanned code is empty after trimming.
    #[error("Invalid barcode: code is empty")]
    InvalidBarcode,

    /// The same device identifier already appears in the candidate sale.
    ///
    /// ## Matching
    /// Device identifiers are compared after normalization (trim +
    /// uppercase), so "imei123" collides with "IMEI123" across ANY line.
    #[error("Device '{device_id}' is already in this sale (line {line})")]
    DuplicateDevice { device_id: String, line: usize },

    /// The device identifier was found in a prior confirmed sale.
    ///
    /// The blocking sale's reference is retained so the UI can show which
    /// transaction already sold this unit.
    #[error("Device '{device_id}' was already sold (sale {sale_ref})")]
    DeviceAlreadySold { device_id: String, sale_ref: String },

    /// Line index out of bounds for a quantity edit.
    #[error("No sale line at index {0}")]
    NoSuchLine(usize),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::SaleNotSyncEligible {
            client_ref: "abc-123".to_string(),
            reason: "total must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Sale abc-123 is not eligible for sync: total must be positive"
        );
    }

    #[test]
    fn test_checkout_error_messages() {
        let err = CheckoutError::DuplicateDevice {
            device_id: "IMEI123".to_string(),
            line: 0,
        };
        assert_eq!(
            err.to_string(),
            "Device 'IMEI123' is already in this sale (line 0)"
        );

        let err = CheckoutError::DeviceAlreadySold {
            device_id: "IMEI123".to_string(),
            sale_ref: "grp-42".to_string(),
        };
        assert!(err.to_string().contains("grp-42"));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "payment_method".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
