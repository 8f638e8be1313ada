//! # Error Types
//!
//! Typed errors for the pure core. The engine crate (vela-pos) folds these
//! into its own taxonomy; the storage crate (vela-db) has its own `DbError`.
//!
//! Stock-related variants always carry the offending product, because the
//! POS surface needs to point the user at the exact cart line.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and domain rule violations.
///
/// Whenever one of these is returned, the cart is guaranteed unchanged —
/// there are no partial mutations to undo.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The product has zero stock.
    #[error("{name} is out of stock")]
    OutOfStock { product_id: String, name: String },

    /// The requested quantity exceeds the currently available stock,
    /// either on add or on a quantity update.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// A product from another store was offered to this cart. Carts bind to
    /// exactly one store; this variant is what makes cross-store carts
    /// impossible by construction.
    #[error("Product {product_id} belongs to store {product_store_id}, cart is bound to {cart_store_id}")]
    StoreMismatch {
        product_id: String,
        product_store_id: String,
        cart_store_id: String,
    },

    /// Quantity update for a product that has no cart line.
    #[error("Product {0} is not in the cart")]
    ProductNotInCart(String),

    /// The distinct-line cap was hit.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Caller input failed validation before any rule ran.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation failures (see [`crate::validation`]).
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value exceeds its length cap.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value outside its allowed range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Malformed value (bad UUID, bad email, ...).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Shorthand constructors so validators read as single expressions.
impl ValidationError {
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub fn too_long(field: &str, max: usize) -> Self {
        ValidationError::TooLong {
            field: field.to_string(),
            max,
        }
    }

    pub fn out_of_range(field: &str, min: i64, max: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        }
    }

    pub fn must_be_positive(field: &str) -> Self {
        ValidationError::MustBePositive {
            field: field.to_string(),
        }
    }

    pub fn invalid_format(field: &str, reason: &str) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience alias for core results.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_error_names_the_product() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            name: "Olive Oil 1L".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Olive Oil 1L: available 3, requested 5"
        );
    }

    #[test]
    fn validation_constructors_render() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");
        assert_eq!(
            ValidationError::must_be_positive("quantity").to_string(),
            "quantity must be positive"
        );
        assert_eq!(
            ValidationError::out_of_range("quantity", 1, 999).to_string(),
            "quantity must be between 1 and 999"
        );
    }

    #[test]
    fn validation_lifts_into_core_error() {
        let err: CoreError = ValidationError::required("name").into();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
