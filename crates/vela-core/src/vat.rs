//! # VAT Decomposition
//!
//! Splits a cart's gross total into net and VAT, grouped by distinct rate.
//!
//! ## Why Grouping Matters
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Multi-rate Cart Decomposition                              │
//! │                                                                         │
//! │  Line A: 12.10 gross @ 10%  x2 ──► net 22.00, vat 2.20 ──┐              │
//! │  Line B: 126.00 gross @ 26% x1 ──► net 100.00, vat 26.00 │              │
//! │                                                          ▼              │
//! │  groups:  "10%" → { net 22.00, vat 2.20 }                               │
//! │           "26%" → { net 100.00, vat 26.00 }                             │
//! │                                                                         │
//! │  netTotal 122.00 + vatTotal 28.20 == grossTotal 150.20 == cart total    │
//! │                                                                         │
//! │  Receipts and tax reporting need the per-RATE split, not per-line;      │
//! │  lines sharing a rate are accumulated into one group.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`decompose`] is the one canonical implementation; every surface that
//! shows a breakdown (cart view, committed sale, receipt) calls it rather
//! than re-deriving the math with its own rounding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::tax::TaxRate;

// =============================================================================
// Rate Group
// =============================================================================

/// Accumulated net and VAT for one distinct tax rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RateGroup {
    pub net_cents: i64,
    pub vat_cents: i64,
}

// =============================================================================
// VAT Breakdown
// =============================================================================

/// The decomposition of a cart's total into net/VAT pairs per distinct rate.
///
/// Derived data: a pure function of the cart lines, recomputed on demand and
/// never partially stale. Serialized with normalized percentage keys
/// (`{"21%": {"netCents": ..., "vatCents": ...}}`), which is also the shape
/// persisted inside a sale snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VatBreakdown {
    /// Per-rate groups, keyed by basis points, ordered by rate.
    #[serde(with = "rate_keyed_map")]
    #[ts(type = "Record<string, RateGroup>")]
    pub groups: BTreeMap<u32, RateGroup>,

    pub net_total_cents: i64,
    pub vat_total_cents: i64,
    pub gross_total_cents: i64,
}

impl VatBreakdown {
    /// Looks up the group for a rate, if any line carried it.
    pub fn group(&self, rate: TaxRate) -> Option<&RateGroup> {
        self.groups.get(&rate.bps())
    }

    /// Number of distinct rates in the breakdown.
    pub fn rate_count(&self) -> usize {
        self.groups.len()
    }
}

// =============================================================================
// Decomposition
// =============================================================================

/// Decomposes a cart into its VAT breakdown.
///
/// Per line: net and VAT via [`crate::money::Money::net_of`] using the
/// line's own frozen rate, accumulated into that rate's group. Totals are
/// the sums over the groups.
///
/// Because each line's net + VAT reconstructs its gross exactly, the
/// resulting `gross_total_cents` always equals `cart.total_cents()` — not
/// merely within tolerance.
///
/// ## Example
/// ```rust
/// use vela_core::cart::Cart;
/// use vela_core::tax::TaxRate;
/// use vela_core::vat::decompose;
/// # use vela_core::types::Product;
/// # use chrono::Utc;
/// # let product = Product {
/// #     id: "p".into(), store_id: "s".into(), name: "X".into(),
/// #     category: String::new(), gross_price_cents: 12_100,
/// #     vat_rate_bps: 2_100, stock: 5, is_active: true,
/// #     created_at: Utc::now(), updated_at: Utc::now(),
/// # };
/// let mut cart = Cart::new("s");
/// cart.add_line(&product, 1).unwrap();
///
/// let breakdown = decompose(&cart);
/// assert_eq!(breakdown.net_total_cents, 10_000);
/// assert_eq!(breakdown.vat_total_cents, 2_100);
/// assert_eq!(breakdown.gross_total_cents, cart.total_cents());
/// ```
pub fn decompose(cart: &Cart) -> VatBreakdown {
    let mut groups: BTreeMap<u32, RateGroup> = BTreeMap::new();
    let mut net_total = 0i64;
    let mut vat_total = 0i64;

    for line in cart.lines() {
        let gross = line.line_gross();
        let rate = line.vat_rate();
        let net = gross.net_of(rate);
        let vat = gross.vat_portion(rate);

        let group = groups.entry(rate.bps()).or_default();
        group.net_cents += net.cents();
        group.vat_cents += vat.cents();

        net_total += net.cents();
        vat_total += vat.cents();
    }

    VatBreakdown {
        groups,
        net_total_cents: net_total,
        vat_total_cents: vat_total,
        gross_total_cents: net_total + vat_total,
    }
}

// =============================================================================
// Serde: percentage-keyed map
// =============================================================================

/// Serializes the bps-keyed group map with normalized percentage keys
/// (`"21%"`), and parses them back on deserialization. JSON object keys must
/// be strings anyway, and the percentage form is the shape the frontend and
/// the persisted sale snapshot both use.
mod rate_keyed_map {
    use std::collections::BTreeMap;

    use serde::de::Error as DeError;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::RateGroup;
    use crate::tax::TaxRate;

    pub fn serialize<S>(groups: &BTreeMap<u32, RateGroup>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(groups.len()))?;
        for (bps, group) in groups {
            map.serialize_entry(&TaxRate::from_bps(*bps).to_string(), group)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<u32, RateGroup>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, RateGroup>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, group)| {
                key.parse::<TaxRate>()
                    .map(|rate| (rate.bps(), group))
                    .map_err(DeError::custom)
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
