//! Monetary helpers over rust_decimal.
//!
//! Arithmetic stays at full precision; rounding to two decimal places
//! happens only at the boundary (validation, persistence, display).
//! Comparisons of money always go through the 0.01 tolerance — exact
//! equality on amounts is a bug.

use rust_decimal::{Decimal, RoundingStrategy};

/// One currency cent, the tolerance absorbed by every money comparison.
pub fn tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Round to two decimal places, midpoint away from zero.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Treat an absent monetary field as zero.
pub fn or_zero(amount: Option<Decimal>) -> Decimal {
    amount.unwrap_or(Decimal::ZERO)
}

/// Clamp a balance at zero; balances never go negative.
pub fn clamp_non_negative(amount: Decimal) -> Decimal {
    amount.max(Decimal::ZERO)
}

/// `a <= b` within the currency tolerance.
pub fn lte_with_tolerance(a: Decimal, b: Decimal) -> bool {
    a <= b + tolerance()
}

/// `a == b` within the currency tolerance.
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= tolerance()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn round2_midpoint_goes_away_from_zero() {
        assert_eq!(round2(dec("1.005")), dec("1.01"));
        assert_eq!(round2(dec("-1.005")), dec("-1.01"));
        assert_eq!(round2(dec("2.344")), dec("2.34"));
    }

    #[test]
    fn tolerance_absorbs_rounding_noise() {
        assert!(within_tolerance(dec("100.00"), dec("100.009")));
        assert!(!within_tolerance(dec("100.00"), dec("100.02")));
        assert!(lte_with_tolerance(dec("100.01"), dec("100.00")));
        assert!(!lte_with_tolerance(dec("100.02"), dec("100.00")));
    }

    #[test]
    fn clamp_never_negative() {
        assert_eq!(clamp_non_negative(dec("-5")), Decimal::ZERO);
        assert_eq!(clamp_non_negative(dec("5")), dec("5"));
    }

    #[test]
    fn absent_money_is_zero() {
        assert_eq!(or_zero(None), Decimal::ZERO);
        assert_eq!(or_zero(Some(dec("3.5"))), dec("3.5"));
    }
}
