//! # Domain Types
//!
//! Core domain types used throughout the Vela transaction engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    Product      │   │      Sale       │   │ StockReservation│        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │        │
//! │  │  store_id       │   │  store_id       │   │  product_id     │        │
//! │  │  gross price    │   │  totals + items │   │  state          │        │
//! │  │  vat_rate_bps   │   │  vat_breakdown  │   │  expires_at     │        │
//! │  │  stock          │   │  customer?      │   │                 │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! │                                                                         │
//! │  Every entity is store-scoped: a product, sale or reservation belongs   │
//! │  to exactly one store, and the engine never mixes stores.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `SaleItem` freezes the product name, unit gross price and VAT rate at
//! the moment of sale, so later catalog edits never alter historical sales.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::tax::TaxRate;
use crate::vat::VatBreakdown;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale in one store.
///
/// Read-only to the transaction engine except for the stock decrement
/// performed by the stock guard at commit time. Prices are gross
/// (tax-inclusive), the way they are shown to the customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Store this product belongs to.
    pub store_id: String,

    /// Display name shown to the cashier and on receipts.
    pub name: String,

    /// Free-form category label.
    pub category: String,

    /// Gross (tax-inclusive) price in cents.
    pub gross_price_cents: i64,

    /// VAT rate in basis points (2100 = 21%).
    pub vat_rate_bps: u32,

    /// Current stock level. Never negative (enforced by a DB CHECK).
    pub stock: i64,

    /// Whether the product is sellable (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the gross price as a Money type.
    #[inline]
    pub fn gross_price(&self) -> Money {
        Money::from_cents(self.gross_price_cents)
    }

    /// Returns the VAT rate.
    #[inline]
    pub fn vat_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.vat_rate_bps)
    }

    /// Checks whether the current stock covers a quantity.
    #[inline]
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Store
// =============================================================================

/// A store within a company.
///
/// Store/company CRUD lives outside the engine; this type exists so store
/// resolution can list a company's stores and bind sessions to one of them.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Store {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid.
///
/// A label only: card authorization happens on an external terminal and is
/// out of scope here.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentMethod {
    /// Physical cash payment (requires tender >= total, change is computed).
    Cash,
    /// Card payment on an external terminal.
    Card,
}

// =============================================================================
// Customer Info
// =============================================================================

/// Optional customer details attached to a sale, denormalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl CustomerInfo {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.email.is_none()
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale transaction.
///
/// Created exactly once by the sale committer, never mutated afterwards and
/// never deleted by the engine. The breakdown and items are snapshots, not
/// live references.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub store_id: String,
    /// User who rang the sale up.
    pub user_id: String,
    pub payment_method: PaymentMethod,
    /// Gross total in cents (what the customer paid).
    pub gross_total_cents: i64,
    pub net_total_cents: i64,
    pub vat_total_cents: i64,
    /// Per-rate breakdown snapshot, keyed by the normalized rate ("21%").
    pub vat_breakdown: VatBreakdown,
    /// Immutable snapshot of the purchased lines.
    pub items: Vec<SaleItem>,
    pub customer: Option<CustomerInfo>,
    /// Cash tendered, for cash sales.
    pub amount_tendered_cents: Option<i64>,
    /// Change returned, for cash sales.
    pub change_cents: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a committed sale.
///
/// Uses the snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit gross price in cents at time of sale (frozen).
    pub unit_gross_price_cents: i64,
    /// VAT rate in basis points at time of sale (frozen).
    pub vat_rate_bps: u32,
    /// Quantity sold.
    pub quantity: i64,
    /// Line gross total (unit price × quantity).
    pub line_gross_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit gross price as Money.
    #[inline]
    pub fn unit_gross_price(&self) -> Money {
        Money::from_cents(self.unit_gross_price_cents)
    }

    /// Returns the line gross total as Money.
    #[inline]
    pub fn line_gross(&self) -> Money {
        Money::from_cents(self.line_gross_cents)
    }
}

// =============================================================================
// Stock Reservation
// =============================================================================

/// Lifecycle state of a stock reservation.
///
/// ```text
/// Requested ──► Reserved ──► Committed   (stock decremented)
///     │             └──────► Released    (hold dropped, incl. expiry sweep)
///     └───────► Rejected                 (never stored)
/// ```
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ReservationState {
    Reserved,
    Committed,
    Released,
}

/// A temporary hold on inventory quantity pending sale completion.
///
/// While `Reserved`, the quantity counts against availability but
/// `Product::stock` itself is untouched; the decrement happens at commit.
/// Reservations that are neither committed nor released are ignored once
/// `expires_at` passes and are cleaned up by the expiry sweep.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockReservation {
    pub id: String,
    pub product_id: String,
    pub store_id: String,
    pub quantity: i64,
    pub state: ReservationState,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// Audit Log
// =============================================================================

/// Severity of an audit event.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AuditSeverity {
    Info,
    Warning,
    Error,
}

/// A structured event handed to the audit log.
///
/// The engine appends these fire-and-forget; querying and filtering the log
/// is an external concern.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuditEvent {
    /// Dotted action name, e.g. `sale.completed`.
    pub action: String,
    /// User who triggered the action.
    pub actor_id: String,
    /// Entity kind, e.g. `sale`.
    pub entity_type: String,
    pub entity_id: String,
    /// JSON image of the entity before the action, if any.
    pub before: Option<String>,
    /// JSON image of the entity after the action, if any.
    pub after: Option<String>,
    pub severity: AuditSeverity,
}

/// A persisted audit log row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuditEntry {
    pub id: String,
    pub action: String,
    pub actor_id: String,
    pub entity_type: String,
    pub entity_id: String,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "before_json"))]
    pub before: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "after_json"))]
    pub after: Option<String>,
    pub severity: AuditSeverity,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Analytics Outbox
// =============================================================================

/// An entry in the analytics outbox queue.
///
/// Committed sales are queued here so the (external) analytics aggregator
/// can refresh dashboards; the engine owns no aggregation state itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AnalyticsOutboxEntry {
    pub id: String,
    pub store_id: String,
    /// Type of entity that changed: "SALE" today, room for more.
    pub entity_type: String,
    pub entity_id: String,
    /// Full entity data as JSON.
    pub payload: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// When the aggregator consumed this entry.
    #[ts(as = "Option<String>")]
    pub processed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64) -> Product {
        Product {
            id: "p-1".to_string(),
            store_id: "s-1".to_string(),
            name: "Test".to_string(),
            category: String::new(),
            gross_price_cents: 1210,
            vat_rate_bps: 2100,
            stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_accessors() {
        let p = product(5);
        assert_eq!(p.gross_price().cents(), 1210);
        assert_eq!(p.vat_rate().bps(), 2100);
        assert!(p.has_stock(5));
        assert!(!p.has_stock(6));
    }

    #[test]
    fn test_customer_info_is_empty() {
        assert!(CustomerInfo::default().is_empty());
        let with_name = CustomerInfo {
            name: Some("Ana".to_string()),
            ..CustomerInfo::default()
        };
        assert!(!with_name.is_empty());
    }
}
