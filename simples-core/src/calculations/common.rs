//! Rounding and formatting shared by the DAS calculator and the PGDAS-D and
//! DEFIS renderers. Money is always rounded half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to cents; `x.xx5` goes away from zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use simples_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a percentage to four decimal places, half away from zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use simples_core::calculations::common::round_rate;
///
/// assert_eq!(round_rate(dec!(4.33)), dec!(4.3300));
/// assert_eq!(round_rate(dec!(6.783333333)), dec!(6.7833));
/// assert_eq!(round_rate(dec!(0.00005)), dec!(0.0001));
/// ```
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// Larger of two amounts; used to clamp a negative effective rate to zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use simples_core::calculations::common::max;
///
/// assert_eq!(max(dec!(100.00), dec!(200.00)), dec!(200.00));
/// assert_eq!(max(dec!(-100.00), dec!(0)), dec!(0));
/// ```
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}

/// Formats an amount with two decimals and a dot separator (`1299.00`), the
/// layout used in the PGDAS-D and DEFIS summaries.
pub fn format_amount(value: Decimal) -> String {
    format!("{:.2}", round_half_up(value))
}
