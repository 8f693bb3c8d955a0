use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::AppError;

/// Amounts are carried as integer cents.
pub type Cents = i64;

/// Largest amount accepted for a single expense: 1,000,000,000.00
pub const MAX_AMOUNT: Cents = 100_000_000_000;

const INVALID_AMOUNT: &str = "Please enter a valid amount";

/// Parse a strictly positive decimal amount like `"12.5"` into cents.
pub fn parse_amount(input: &str) -> Result<Cents, AppError> {
    let cents = parse_non_negative(input)?;
    if cents == 0 {
        return Err(AppError::Validation(INVALID_AMOUNT.to_string()));
    }
    Ok(cents)
}

/// Like [`parse_amount`] but zero is allowed.
pub fn parse_non_negative(input: &str) -> Result<Cents, AppError> {
    let invalid = || AppError::Validation(INVALID_AMOUNT.to_string());
    let trimmed = input.trim();

    // Decimal is lenient about ".5", "5." and digit separators
    if trimmed.starts_with('.') || trimmed.ends_with('.') || trimmed.contains('_') {
        return Err(invalid());
    }

    let amount = Decimal::from_str(trimmed).map_err(|_| invalid())?;
    if amount.is_sign_negative() || amount.scale() > 2 {
        return Err(invalid());
    }

    let cents = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|c| c.to_i64())
        .ok_or_else(invalid)?;

    if cents > MAX_AMOUNT {
        return Err(invalid());
    }
    Ok(cents)
}

/// Render cents as a plain decimal string, e.g. `-0.50`.
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amounts() {
        assert_eq!(parse_amount("12").unwrap(), 1200);
        assert_eq!(parse_amount(" 12.5 ").unwrap(), 1250);
        assert_eq!(parse_amount("0.01").unwrap(), 1);
        assert_eq!(parse_amount("1000000000.00").unwrap(), MAX_AMOUNT);
        assert_eq!(parse_amount("7.10").unwrap(), 710);
    }

    #[test]
    fn test_rejects_amounts_beyond_cents_range() {
        for input in ["99999999999999999999999999", "123456789012345678.5"] {
            assert!(matches!(parse_amount(input), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn test_rejects_invalid_amounts() {
        for input in ["", " ", "0", "0.00", "-5", "abc", "1.234", "1,50", ".5", "5.", "1e3", "1_000", "+-1", "1000000000.01"] {
            assert!(
                matches!(parse_amount(input), Err(AppError::Validation(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_zero_allowed_when_non_negative() {
        assert_eq!(parse_non_negative("0").unwrap(), 0);
        assert_eq!(parse_non_negative("0.00").unwrap(), 0);
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(1250), "12.50");
        assert_eq!(format_cents(-50), "-0.50");
        assert_eq!(format_cents(-12345), "-123.45");
    }
}
