//! Decimal money helpers.
//!
//! Amounts are plain [`Decimal`]s in the store currency's standard unit
//! (dollars, not cents). Everything that is shown to a customer or persisted as
//! an order total goes through [`round_currency`].

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places used for currency amounts.
pub const CURRENCY_DP: u32 = 2;

/// Round an amount to two decimal places, midpoint away from zero.
///
/// ```
/// use marketplace_core::round_currency;
/// use rust_decimal::Decimal;
///
/// assert_eq!(round_currency(Decimal::new(10_005, 3)), Decimal::new(1001, 2));
/// assert_eq!(round_currency(Decimal::new(-10_005, 3)), Decimal::new(-1001, 2));
/// ```
#[must_use]
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount × percent / 100`, unrounded.
#[must_use]
pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    amount * percent / Decimal::ONE_HUNDRED
}

/// Convert an amount to integer minor units (cents), rounding half away from zero.
///
/// Returns `None` if the amount does not fit in an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    let cents = amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    i64::try_from(cents).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_currency_midpoint() {
        assert_eq!(round_currency(Decimal::new(2_345, 3)), Decimal::new(235, 2));
        assert_eq!(round_currency(Decimal::new(2_344, 3)), Decimal::new(234, 2));
        assert_eq!(round_currency(Decimal::from(85)), Decimal::from(85));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(
            percent_of(Decimal::from(100), Decimal::from(20)),
            Decimal::from(20)
        );
        assert_eq!(
            percent_of(Decimal::new(1999, 2), Decimal::from(15)),
            Decimal::new(29_985, 4)
        );
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(4000, 2)), Some(4000));
        assert_eq!(to_minor_units(Decimal::new(19_995, 3)), Some(2000));
        assert_eq!(to_minor_units(Decimal::ZERO), Some(0));
        assert_eq!(to_minor_units(Decimal::MAX), None);
    }
}
