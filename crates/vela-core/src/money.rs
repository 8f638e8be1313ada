//! # Money Module
//!
//! Integer-cent money and the gross→net split that every VAT figure in the
//! system derives from.
//!
//! ## One Division, One Rounding
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Prices are GROSS (tax-inclusive) and stored as i64 cents. The only     │
//! │  division in the whole engine is gross → net:                           │
//! │                                                                         │
//! │      net = round_half_up( gross / (1 + rate) )                          │
//! │      vat = gross - net          ← remainder, never rounded on its own   │
//! │                                                                         │
//! │  Consequence: net + vat reconstructs gross EXACTLY, per line, so a      │
//! │  fifty-line mixed-rate cart can never show a breakdown that disagrees   │
//! │  with its own total. Floats never enter the picture.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```rust
//! use vela_core::money::Money;
//! use vela_core::tax::TaxRate;
//!
//! let gross = Money::from_cents(12_100); // 121.00 shown to the customer
//! let rate = TaxRate::from_bps(2_100);   // 21%
//!
//! assert_eq!(gross.net_of(rate), Money::from_cents(10_000));
//! assert_eq!(gross.net_of(rate) + gross.vat_portion(rate), gross);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::tax::TaxRate;

/// A monetary value in the smallest currency unit (cents).
///
/// Signed so that change math can transiently dip negative; a newtype over
/// i64 so arithmetic stays zero-cost and serde sees a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Wraps a cent amount.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// The raw cent amount.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// True for exactly zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Net (tax-exclusive) portion of this gross amount.
    ///
    /// Integer math with half-up rounding to the cent, i128 intermediates:
    ///
    /// ```text
    /// den = 10000 + bps
    /// net = (gross * 10000 * 2 + den) / (den * 2)   // == round(gross*10000/den)
    /// ```
    ///
    /// Contract, for gross >= 0 and any rate: `net_of(r) + vat_portion(r)`
    /// equals the gross exactly, because [`Money::vat_portion`] is defined
    /// as the remainder. A zero rate returns the gross untouched.
    pub fn net_of(&self, rate: TaxRate) -> Money {
        if rate.is_zero() {
            return *self;
        }
        let den = 10_000i128 + rate.bps() as i128;
        let scaled = self.0 as i128 * 10_000;
        Money(((scaled * 2 + den) / (den * 2)) as i64)
    }

    /// VAT portion of this gross amount: `gross - net_of(rate)`.
    #[inline]
    pub fn vat_portion(&self, rate: TaxRate) -> Money {
        *self - self.net_of(rate)
    }

    /// Scales by a line quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Log/debug formatting ("12.10", "-5.50"). User-facing display, including
/// the currency symbol and locale, belongs to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = self.0.abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// Quantity scaling via the `*` operator.
impl Mul<i64> for Money {
    type Output = Self;
    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_round_trip() {
        assert_eq!(Money::from_cents(1099).cents(), 1099);
        assert_eq!(Money::zero().cents(), 0);
        assert!(Money::zero().is_zero());
    }

    #[test]
    fn display_formats_cent_amounts() {
        assert_eq!(Money::from_cents(1210).to_string(), "12.10");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
    }

    #[test]
    fn arithmetic_operators() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(300);

        assert_eq!((a + b).cents(), 1300);
        assert_eq!((a - b).cents(), 700);
        assert_eq!((b * 4).cents(), 1200);
        assert_eq!(b.multiply_quantity(3).cents(), 900);

        let mut acc = Money::zero();
        acc += a;
        acc -= b;
        assert_eq!(acc.cents(), 700);
    }

    #[test]
    fn net_of_splits_round_figures() {
        // 121.00 at 21% -> net 100.00, vat 21.00
        let gross = Money::from_cents(12_100);
        let rate = TaxRate::from_bps(2_100);
        assert_eq!(gross.net_of(rate).cents(), 10_000);
        assert_eq!(gross.vat_portion(rate).cents(), 2_100);
    }

    #[test]
    fn net_of_zero_rate_is_identity() {
        let gross = Money::from_cents(4_217);
        assert_eq!(gross.net_of(TaxRate::zero()), gross);
        assert!(gross.vat_portion(TaxRate::zero()).is_zero());
    }

    #[test]
    fn net_of_rounds_half_up() {
        // 1.00 at 21%: 100 / 1.21 = 82.64... -> 83
        let rate = TaxRate::from_bps(2_100);
        assert_eq!(Money::from_cents(100).net_of(rate).cents(), 83);
        assert_eq!(Money::from_cents(100).vat_portion(rate).cents(), 17);

        // 24.20 at 10% divides exactly
        let rate = TaxRate::from_bps(1_000);
        assert_eq!(Money::from_cents(2_420).net_of(rate).cents(), 2_200);
    }

    /// The load-bearing contract: the split reconstructs the gross exactly
    /// for every rate, so breakdown totals can never drift from cart totals.
    #[test]
    fn gross_identity_is_exact() {
        let rates = [0u32, 400, 825, 1_000, 2_100, 2_600, 10_000];
        for cents in [0i64, 1, 99, 100, 101, 12_100, 999_999, 123_456_789] {
            let gross = Money::from_cents(cents);
            for bps in rates {
                let rate = TaxRate::from_bps(bps);
                assert_eq!(
                    gross.net_of(rate) + gross.vat_portion(rate),
                    gross,
                    "identity broke for {cents} cents at {bps} bps"
                );
            }
        }
    }
}
