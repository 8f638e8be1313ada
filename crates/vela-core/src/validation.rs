//! # Validation Module
//!
//! Early input checks, run before any business rule. The database repeats
//! the critical ones as CHECK constraints (`stock >= 0`, the rate range),
//! so a bug in a caller still cannot corrupt stored data.

use crate::error::ValidationError;
use crate::types::CustomerInfo;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// A cart line quantity: strictly positive, capped at [`MAX_LINE_QUANTITY`].
///
/// The cap exists to catch fat-finger entries (1000 instead of 10) before
/// they reach stock checks.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        Err(ValidationError::must_be_positive("quantity"))
    } else if qty > MAX_LINE_QUANTITY {
        Err(ValidationError::out_of_range("quantity", 1, MAX_LINE_QUANTITY))
    } else {
        Ok(())
    }
}

/// A gross price in cents. Zero is a legal price (giveaways); negative is not.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        Err(ValidationError::out_of_range("grossPrice", 0, i64::MAX))
    } else {
        Ok(())
    }
}

/// A VAT rate in basis points: 0..=10000 (0% to 100%).
pub fn validate_vat_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        Err(ValidationError::out_of_range("vatRate", 0, 10_000))
    } else {
        Ok(())
    }
}

/// A cash tender amount: strictly positive.
pub fn validate_tendered_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        Err(ValidationError::must_be_positive("amountTendered"))
    } else {
        Ok(())
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// A product display name: non-empty after trimming, at most 200 chars.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(ValidationError::required("name"))
    } else if trimmed.len() > 200 {
        Err(ValidationError::too_long("name", 200))
    } else {
        Ok(())
    }
}

/// A UUID-formatted id.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| ValidationError::invalid_format("id", "must be a valid UUID"))
}

/// Optional customer info attached to a sale.
///
/// Everything is optional; present fields get a light format check. The
/// data is stored denormalized on the sale, so there is no customer entity
/// to cross-reference.
pub fn validate_customer_info(customer: &CustomerInfo) -> ValidationResult<()> {
    match &customer.name {
        Some(name) if name.len() > 200 => return Err(ValidationError::too_long("customer.name", 200)),
        _ => {}
    }

    match &customer.email {
        Some(email) if !email.contains('@') || email.len() > 254 => {
            return Err(ValidationError::invalid_format(
                "customer.email",
                "must be a valid email address",
            ));
        }
        _ => {}
    }

    match &customer.phone {
        Some(phone) if phone.len() > 32 => return Err(ValidationError::too_long("customer.phone", 32)),
        _ => {}
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
    fn quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn price_allows_zero_rejects_negative() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-1).is_err());
    }

    #[test]
    fn vat_rate_caps_at_hundred_percent() {
        assert!(validate_vat_rate_bps(0).is_ok());
        assert!(validate_vat_rate_bps(2_100).is_ok());
        assert!(validate_vat_rate_bps(10_000).is_ok());
        assert!(validate_vat_rate_bps(10_001).is_err());
    }

    #[test]
    fn uuid_format() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn customer_info_checks_present_fields_only() {
        assert!(validate_customer_info(&CustomerInfo::default()).is_ok());

        let full = CustomerInfo {
            name: Some("Ana García".to_string()),
            phone: Some("+34 600 000 000".to_string()),
            email: Some("ana@example.com".to_string()),
        };
        assert!(validate_customer_info(&full).is_ok());

        let bad_email = CustomerInfo {
            email: Some("not-an-email".to_string()),
            ..CustomerInfo::default()
        };
        assert!(validate_customer_info(&bad_email).is_err());
    }
}
