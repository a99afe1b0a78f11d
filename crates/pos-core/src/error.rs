//! # Error Types
//!
//! Domain-specific error types for pos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  pos-core errors (this file)                                    │
//! │  ├── CoreError        - Business rule violations                │
//! │  └── ValidationError  - Input validation failures               │
//! │                                                                 │
//! │  pos-db errors (separate crate)                                 │
//! │  └── DbError          - Storage failures, wraps CoreError       │
//! │                                                                 │
//! │  Flow: ValidationError → CoreError → DbError → presentation     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derives, never manual impls
//! 2. Context in every message (product code, available amount, etc.) so
//!    the presentation layer can show the specific cause, not a generic
//!    failure notice
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// Validation-class errors (`InvalidQuantity`, `EmptyCart`, ...) are
/// detected before any mutation; the caller sees them with no side effects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Requested quantity exceeds available stock.
    ///
    /// Raised both by the cart's advisory check at add/update time and by
    /// the checkout engine's authoritative re-validation. Carries the
    /// offending product and the amount actually available so the cashier
    /// can adjust and retry.
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// Quantity below 1 or above the per-line maximum.
    #[error("Invalid quantity {requested}: must be between 1 and {max}")]
    InvalidQuantity { requested: i64, max: i64 },

    /// Non-positive amount where a positive one is required (restock).
    #[error("Invalid amount {amount}: must be positive")]
    InvalidAmount { amount: i64 },

    /// Checkout attempted with no cart lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// `set_quantity` on a product that has no line in the cart.
    #[error("Product {product_id} not in cart")]
    LineNotFound { product_id: String },

    /// Cart has reached the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// The actor's role does not permit the attempted operation.
    #[error("Unauthorized: {required} access required")]
    Unauthorized { required: &'static str },

    /// Input validation failure (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before business logic runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (bad charset, not a UUID, ...).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
    fn test_insufficient_stock_message_names_product() {
        let err = CoreError::InsufficientStock {
            code: "COCOLA-500".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for COCOLA-500: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "price".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
