//! # Cart Module
//!
//! The in-memory shopping cart: an ordered, mutable collection of lines,
//! bound to exactly one store.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cart Operations                                   │
//! │                                                                         │
//! │  POS Action               Cart Operation          State Change          │
//! │  ──────────               ──────────────          ────────────          │
//! │                                                                         │
//! │  Click Product ─────────► add_line() ───────────► merge or append       │
//! │                                                                         │
//! │  Change Quantity ───────► set_quantity() ───────► line.quantity = n     │
//! │                           (n <= 0 removes)                              │
//! │                                                                         │
//! │  Click Remove ──────────► remove_line() ────────► retain others         │
//! │                                                                         │
//! │  Checkout / Cancel ─────► clear() ──────────────► lines.clear()         │
//! │                                                                         │
//! │  Every mutation validates against the LIVE product handed in by the     │
//! │  caller: store binding, active stock, quantity caps. Failures leave     │
//! │  the cart unchanged (no partial updates).                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Add-time stock checks here are best-effort: the stock guard re-validates
//! against current stock at commit time, which is the authoritative check.
//! Nothing in this module persists; a cart lives and dies with its session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tax::TaxRate;
use crate::types::Product;
use crate::{validation, MAX_CART_LINES};

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the shopping cart.
///
/// ## Price Freezing
/// Name, unit price and VAT rate are captured when the product is first
/// added. If the catalog changes while the cart is open, the line keeps the
/// values the customer saw.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    /// Product ID (UUID), for the commit-time stock check.
    pub product_id: String,

    /// Product name at time of adding (frozen).
    pub name: String,

    /// Gross unit price in cents at time of adding (frozen).
    pub unit_gross_price_cents: i64,

    /// VAT rate in basis points at time of adding (frozen).
    pub vat_rate_bps: u32,

    /// Quantity in cart, always >= 1.
    pub quantity: i64,

    /// When this line was first added.
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a new cart line from a product snapshot and quantity.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_gross_price_cents: product.gross_price_cents,
            vat_rate_bps: product.vat_rate_bps,
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Gross line total in cents (unit price × quantity).
    #[inline]
    pub fn line_gross_cents(&self) -> i64 {
        self.unit_gross_price_cents * self.quantity
    }

    /// Gross line total as Money.
    #[inline]
    pub fn line_gross(&self) -> Money {
        Money::from_cents(self.line_gross_cents())
    }

    /// This line's VAT rate.
    #[inline]
    pub fn vat_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.vat_rate_bps)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart for one POS session.
///
/// ## Invariants
/// - Bound to exactly one store; every line references a product of that
///   store (cross-store carts are rejected by construction)
/// - Lines are unique by `product_id` (adding the same product merges)
/// - Line quantity is always >= 1 (setting it to zero removes the line)
/// - At most [`MAX_CART_LINES`] distinct lines
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    store_id: String,
    lines: Vec<CartLine>,
    #[ts(as = "String")]
    created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart bound to a store.
    pub fn new(store_id: impl Into<String>) -> Self {
        Cart {
            store_id: store_id.into(),
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// The store this cart is bound to.
    #[inline]
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// The lines, in insertion order.
    #[inline]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Adds a product to the cart or increases quantity if already present.
    ///
    /// ## Errors
    /// - [`CoreError::StoreMismatch`] if the product belongs to another store
    /// - [`CoreError::OutOfStock`] if the product has no stock at all
    /// - [`CoreError::InsufficientStock`] if the resulting quantity would
    ///   exceed the product's current stock
    /// - [`CoreError::CartTooLarge`] past the distinct-line cap
    ///
    /// On any error the cart is left exactly as it was.
    pub fn add_line(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validation::validate_quantity(quantity)?;
        self.ensure_same_store(product)?;

        if product.stock <= 0 {
            return Err(CoreError::OutOfStock {
                product_id: product.id.clone(),
                name: product.name.clone(),
            });
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let requested = line.quantity + quantity;
            if requested > product.stock {
                return Err(CoreError::InsufficientStock {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    available: product.stock,
                    requested,
                });
            }
            validation::validate_quantity(requested)?;
            line.quantity = requested;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        if quantity > product.stock {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                name: product.name.clone(),
                available: product.stock,
                requested: quantity,
            });
        }

        self.lines.push(CartLine::from_product(product, quantity));
        Ok(())
    }

    /// Sets the quantity of an existing line.
    ///
    /// ## Behavior
    /// - quantity <= 0 removes the line (not an error)
    /// - quantity above the product's current stock fails with
    ///   [`CoreError::InsufficientStock`] and leaves the cart unchanged
    /// - a product with no line fails with [`CoreError::ProductNotInCart`]
    pub fn set_quantity(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        self.ensure_same_store(product)?;

        if quantity <= 0 {
            self.remove_line(&product.id);
            return Ok(());
        }

        validation::validate_quantity(quantity)?;

        if quantity > product.stock {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                name: product.name.clone(),
                available: product.stock,
                requested: quantity,
            });
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product.id)
            .ok_or_else(|| CoreError::ProductNotInCart(product.id.clone()))?;

        line.quantity = quantity;
        Ok(())
    }

    /// Removes a line by product ID. Removing an absent line is a no-op.
    pub fn remove_line(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Empties the cart (after a successful checkout or an explicit cancel).
    pub fn clear(&mut self) {
        self.lines.clear();
        self.created_at = Utc::now();
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Gross total in cents: Σ unit price × quantity.
    pub fn total_cents(&self) -> i64 {
        self.lines.iter().map(|l| l.line_gross_cents()).sum()
    }

    /// Gross total as Money.
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents())
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn ensure_same_store(&self, product: &Product) -> CoreResult<()> {
        if product.store_id != self.store_id {
            return Err(CoreError::StoreMismatch {
                product_id: product.id.clone(),
                product_store_id: product.store_id.clone(),
                cart_store_id: self.store_id.clone(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(id: &str, gross_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            store_id: "store-1".to_string(),
            name: format!("Product {}", id),
            category: "grocery".to_string(),
            gross_price_cents: gross_cents,
            vat_rate_bps: 2100,
            stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_line() {
        let mut cart = Cart::new("store-1");
        let product = test_product("1", 999, 10);

        cart.add_line(&product, 2).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.total_cents(), 1998);
    }

    #[test]
    fn test_add_same_product_merges_quantity() {
        let mut cart = Cart::new("store-1");
        let product = test_product("1", 999, 10);

        cart.add_line(&product, 2).unwrap();
        cart.add_line(&product, 3).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_add_rejects_out_of_stock() {
        let mut cart = Cart::new("store-1");
        let product = test_product("1", 999, 0);

        let err = cart.add_line(&product, 1).unwrap_err();
        assert!(matches!(err, CoreError::OutOfStock { .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_rejects_insufficient_stock() {
        let mut cart = Cart::new("store-1");
        let product = test_product("1", 999, 3);

        cart.add_line(&product, 2).unwrap();
        let err = cart.add_line(&product, 2).unwrap_err();

        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Cart unchanged by the failed add
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_add_rejects_other_store() {
        let mut cart = Cart::new("store-1");
        let mut product = test_product("1", 999, 10);
        product.store_id = "store-2".to_string();

        let err = cart.add_line(&product, 1).unwrap_err();
        assert!(matches!(err, CoreError::StoreMismatch { .. }));
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::new("store-1");
        let product = test_product("1", 999, 10);

        cart.add_line(&product, 2).unwrap();
        cart.set_quantity(&product, 5).unwrap();
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_set_quantity_never_exceeds_stock() {
        let mut cart = Cart::new("store-1");
        let product = test_product("1", 999, 4);

        cart.add_line(&product, 2).unwrap();
        let err = cart.set_quantity(&product, 5).unwrap_err();

        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        // No partial update
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::new("store-1");
        let product = test_product("1", 999, 10);

        cart.add_line(&product, 2).unwrap();
        cart.set_quantity(&product, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_missing_line_errors() {
        let mut cart = Cart::new("store-1");
        let product = test_product("1", 999, 10);

        let err = cart.set_quantity(&product, 1).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotInCart(_)));
    }

    #[test]
    fn test_remove_line_is_idempotent() {
        let mut cart = Cart::new("store-1");
        let product = test_product("1", 999, 10);

        cart.add_line(&product, 1).unwrap();
        cart.remove_line("1");
        cart.remove_line("1"); // second removal is a no-op
        assert!(cart.is_empty());
    }

    #[test]
    fn test_line_freezes_price() {
        let mut cart = Cart::new("store-1");
        let mut product = test_product("1", 999, 10);

        cart.add_line(&product, 1).unwrap();
        product.gross_price_cents = 1299;
        cart.add_line(&product, 1).unwrap();

        // The merged line keeps the price captured on first add
        assert_eq!(cart.lines()[0].unit_gross_price_cents, 999);
        assert_eq!(cart.total_cents(), 1998);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new("store-1");
        let product = test_product("1", 999, 10);

        cart.add_line(&product, 2).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_cents(), 0);
    }
}
