//! # Validation Module
//!
//! Field-level validation rules shared by the checkout form and the
//! submit path.
//!
//! ## Design
//! Each function checks one field and returns a typed
//! [`ValidationError`](crate::error::ValidationError) on failure. The
//! checkout form collects ALL violations into a list before submit;
//! individual repositories and the cache manager call these helpers
//! directly for fail-fast checks.

use crate::error::ValidationError;
use crate::{MAX_LINE_QUANTITY, MAX_SALE_LINES};

// =============================================================================
// Field Validators
// =============================================================================

/// Validates that a text field is non-empty after trimming.
pub fn validate_required(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a resolvable numeric store id.
///
/// A sale cannot be queued (or submitted) without one. This is checked
/// BEFORE any persistence or network attempt.
pub fn validate_store_id(store_id: Option<i64>) -> Result<i64, ValidationError> {
    match store_id {
        Some(id) if id > 0 => Ok(id),
        Some(_) => Err(ValidationError::MustBePositive {
            field: "store_id".to_string(),
        }),
        None => Err(ValidationError::Required {
            field: "store_id".to_string(),
        }),
    }
}

/// Validates a line quantity (1..=MAX_LINE_QUANTITY).
pub fn validate_quantity(qty: i64) -> Result<(), ValidationError> {
    if qty < 1 || qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates the line count of a candidate sale.
pub fn validate_line_count(count: usize) -> Result<(), ValidationError> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }
    if count > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        });
    }
    Ok(())
}

/// Validates a payment method label.
pub fn validate_payment_method(method: &str) -> Result<(), ValidationError> {
    validate_required("payment_method", method)
}

/// Validates that a sale total is strictly positive.
pub fn validate_total_cents(total_cents: i64) -> Result<(), ValidationError> {
    if total_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "total".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("payment_method", "cash").is_ok());
        assert!(validate_required("payment_method", "").is_err());
        assert!(validate_required("payment_method", "   ").is_err());
    }

    #[test]
    fn test_validate_store_id() {
        assert_eq!(validate_store_id(Some(7)).unwrap(), 7);
        assert!(validate_store_id(Some(0)).is_err());
        assert!(validate_store_id(Some(-1)).is_err());
        assert!(validate_store_id(None).is_err());
    }

    #[test]
    fn test_validate_quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(0).is_err());
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(MAX_SALE_LINES).is_ok());
        assert!(validate_line_count(MAX_SALE_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_total_must_be_positive() {
        assert!(validate_total_cents(1).is_ok());
        assert!(validate_total_cents(0).is_err());
        assert!(validate_total_cents(-500).is_err());
    }
}
