//! # Engine Error Type
//!
//! Unified error type for the sale transaction engine.
//!
//! ## Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  How Callers Should React                               │
//! │                                                                         │
//! │  EmptyCart, InsufficientPayment      validation — report, no retry      │
//! │  OutOfStock, InsufficientStock       names the product; cart is left    │
//! │                                      intact so the user can adjust      │
//! │  NoStoreAssigned, NoStoresAvailable  fatal for the session; needs       │
//! │                                      administrative action              │
//! │  StoreSelectionRequired,             the admin must pick (a valid)      │
//! │  StoreNotInCompany                   store first                        │
//! │  Cart, Db                            wrapped lower-layer errors         │
//! │                                                                         │
//! │  All of these are synchronous Results; user-facing messaging is the     │
//! │  request handler's job, never this crate's.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use vela_core::CoreError;
use vela_db::DbError;

/// Errors produced by the sale transaction engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Checkout attempted with no lines in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cash tendered is less than the cart total.
    #[error("Insufficient payment: {shortfall_cents} cents short")]
    InsufficientPayment { shortfall_cents: i64 },

    /// Product has no stock at all.
    #[error("{name} is out of stock")]
    OutOfStock { product_id: String, name: String },

    /// Requested quantity exceeds what is currently available.
    ///
    /// Raised both at cart time (against the live catalog row) and at
    /// commit time (against stock minus live reservations). The cart is
    /// always left intact.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// A manager actor with no store bound to them.
    #[error("No store assigned to user {user_id}")]
    NoStoreAssigned { user_id: String },

    /// A company admin whose company has zero stores.
    #[error("Company {company_id} has no stores")]
    NoStoresAvailable { company_id: String },

    /// A company admin opened a session without picking a store.
    #[error("A store must be selected before opening a POS session")]
    StoreSelectionRequired,

    /// The selected store belongs to a different company.
    #[error("Store {store_id} does not belong to company {company_id}")]
    StoreNotInCompany {
        store_id: String,
        company_id: String,
    },

    /// Unknown or closed POS session.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Product missing from the catalog, or soft-deleted.
    #[error("Product not available: {0}")]
    ProductNotAvailable(String),

    /// Store missing from the directory.
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    /// Other cart-level rule violations (store mismatch, caps, validation).
    #[error(transparent)]
    Cart(CoreError),

    /// Storage failures.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Cart errors about stock map onto the engine's own stock variants so
/// callers see one taxonomy regardless of which layer caught the problem.
impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::OutOfStock { product_id, name } => {
                EngineError::OutOfStock { product_id, name }
            }
            CoreError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => EngineError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            },
            other => EngineError::Cart(other),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
