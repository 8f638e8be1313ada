//! # Tax Rate Module
//!
//! Per-product VAT rates, held as integer basis points (2100 bps = 21%).
//! Percentages only ever appear for display and as the normalized map key
//! (`"21%"`, `"8.25%"`) that groups VAT breakdown entries — the key format
//! is round-trippable via [`std::str::FromStr`], which is what lets a
//! persisted breakdown snapshot deserialize back into rates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;

/// A VAT rate in basis points. 1 bp = 0.01%, so the full range 0..=10000
/// covers 0% to 100%.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Wraps a basis-point value.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Converts a percentage, rounding to the nearest basis point.
    ///
    /// ```rust
    /// use vela_core::tax::TaxRate;
    /// assert_eq!(TaxRate::from_percentage(8.25).bps(), 825);
    /// ```
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// The raw basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// The rate as a percentage, display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// The 0% rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// True for the 0% rate.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// The normalized percentage key: trailing zeros trimmed, so one rate has
/// exactly one key. `2100 -> "21%"`, `825 -> "8.25%"`, `550 -> "5.5%"`.
impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        match self.0 % 100 {
            0 => write!(f, "{whole}%"),
            frac if frac % 10 == 0 => write!(f, "{whole}.{}%", frac / 10),
            frac => write!(f, "{whole}.{frac:02}%"),
        }
    }
}

/// Failed to parse a percentage key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tax rate key: {0}")]
pub struct ParseTaxRateError(String);

/// Parses the key produced by `Display`. The `%` suffix is optional and at
/// most two fractional digits are accepted.
impl FromStr for TaxRate {
    type Err = ParseTaxRateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseTaxRateError(s.to_string());
        let trimmed = s.trim().trim_end_matches('%');

        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let whole: u32 = whole.parse().map_err(|_| bad())?;

        let frac_bps = match frac.len() {
            0 => 0,
            1 => frac.parse::<u32>().map_err(|_| bad())? * 10,
            2 => frac.parse::<u32>().map_err(|_| bad())?,
            _ => return Err(bad()),
        };

        Ok(TaxRate(whole * 100 + frac_bps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bps_and_percentage_agree() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < 0.001);
        assert_eq!(TaxRate::from_percentage(21.0), TaxRate::from_bps(2100));
    }

    #[test]
    fn display_key_is_normalized() {
        assert_eq!(TaxRate::from_bps(2100).to_string(), "21%");
        assert_eq!(TaxRate::from_bps(1000).to_string(), "10%");
        assert_eq!(TaxRate::from_bps(825).to_string(), "8.25%");
        assert_eq!(TaxRate::from_bps(550).to_string(), "5.5%");
        assert_eq!(TaxRate::zero().to_string(), "0%");
    }

    #[test]
    fn keys_round_trip() {
        for bps in [0u32, 400, 550, 825, 1000, 2100, 2600] {
            let rate = TaxRate::from_bps(bps);
            assert_eq!(rate.to_string().parse::<TaxRate>(), Ok(rate));
        }
        // the suffix is optional
        assert_eq!("21".parse::<TaxRate>(), Ok(TaxRate::from_bps(2100)));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        for bad in ["", "abc%", "1.234%", "-5%", "8..25%"] {
            assert!(bad.parse::<TaxRate>().is_err(), "{bad} should not parse");
        }
    }
}
