//! Small shared utilities

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Convert a decimal price to minor units (integer cents), rounded to the
/// nearest cent.
///
/// Returns `None` for negative amounts or amounts too large for i64 cents.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    if amount.is_sign_negative() {
        return None;
    }
    let cents = (amount * Decimal::from(100)).round();
    cents.to_i64()
}

/// Convert minor units (integer cents) back to a decimal amount.
pub fn from_minor_units(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_to_minor_units_exact() {
        assert_eq!(to_minor_units(dec("10.00")), Some(1000));
        assert_eq!(to_minor_units(dec("0.01")), Some(1));
        assert_eq!(to_minor_units(dec("0")), Some(0));
    }

    #[test]
    fn test_to_minor_units_rounds() {
        assert_eq!(to_minor_units(dec("19.999")), Some(2000));
        assert_eq!(to_minor_units(dec("19.994")), Some(1999));
    }

    #[test]
    fn test_to_minor_units_rejects_negative() {
        assert_eq!(to_minor_units(dec("-1.00")), None);
    }

    #[test]
    fn test_from_minor_units() {
        assert_eq!(from_minor_units(2000), dec("20.00"));
        assert_eq!(from_minor_units(1), dec("0.01"));
    }
}
