//! Monthly DAS calculation for the Simples Nacional regime (PGDAS-D).
//!
//! The amount due is derived from two revenue figures:
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Select the rate table of the company's Anexo |
//! | 2    | Find the bracket for the trailing twelve-month revenue (RBT12) |
//! | 3    | Effective rate = (RBT12 × nominal rate − deduction) / RBT12, never negative |
//! | 4    | DAS due = month revenue × effective rate |
//!
//! The effective rate is reported with four decimal places and the amount due
//! is rounded to cents.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use simples_core::{Anexo, BracketSchedule, DasCalculator, TaxCalculationInput};
//!
//! let schedule = BracketSchedule::simples_nacional();
//! let calculator = DasCalculator::new(&schedule);
//!
//! let input = TaxCalculationInput {
//!     period_id: "2025-03".to_string(),
//!     category: Anexo::I,
//!     month_revenue: dec!(30000),
//!     trailing_twelve_month_revenue: dec!(200000),
//! };
//!
//! let result = calculator.calculate(&input).unwrap();
//!
//! assert_eq!(result.nominal_rate_percent, dec!(7.3));
//! assert_eq!(result.deduction_amount, dec!(5940));
//! assert_eq!(result.effective_rate_percent, dec!(4.33));
//! assert_eq!(result.amount_due, dec!(1299.00));
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::{max, round_half_up, round_rate};
use crate::models::{BracketSchedule, TaxCalculationInput, TaxCalculationResult};

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Errors that can occur during a DAS calculation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DasError {
    /// A numeric input was negative or a field was malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The Anexo is not one of the five categories, or the schedule has no
    /// table for it.
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
}

/// Calculator for the monthly DAS.
///
/// Borrows a [`BracketSchedule`] so one schedule can back any number of
/// calculations, including concurrent ones.
#[derive(Debug, Clone, Copy)]
pub struct DasCalculator<'a> {
    schedule: &'a BracketSchedule,
}

impl<'a> DasCalculator<'a> {
    pub fn new(schedule: &'a BracketSchedule) -> Self {
        Self { schedule }
    }

    /// Calculates the DAS for one competência.
    ///
    /// A zero RBT12 yields a zero effective rate and a zero amount due rather
    /// than dividing by zero.
    ///
    /// # Errors
    ///
    /// Returns [`DasError::InvalidInput`] for a negative revenue, a revenue
    /// too large for the rate arithmetic, or a period not in `YYYY-MM` form.
    /// Returns [`DasError::UnknownCategory`] when the schedule has no table
    /// for the input's Anexo.
    pub fn calculate(
        &self,
        input: &TaxCalculationInput,
    ) -> Result<TaxCalculationResult, DasError> {
        validate_period_id(&input.period_id)?;
        validate_non_negative("month_revenue", input.month_revenue)?;
        validate_non_negative(
            "trailing_twelve_month_revenue",
            input.trailing_twelve_month_revenue,
        )?;

        let table = self
            .schedule
            .table(input.category)
            .ok_or_else(|| DasError::UnknownCategory(input.category.to_string()))?;

        let rbt12 = input.trailing_twelve_month_revenue;
        let bracket = table.find(rbt12);

        debug!(
            period = %input.period_id,
            anexo = %input.category,
            bracket = table.position(rbt12) + 1,
            "matched DAS bracket"
        );

        if rbt12.is_zero() {
            return Ok(TaxCalculationResult {
                nominal_rate_percent: bracket.nominal_rate,
                deduction_amount: bracket.deduction,
                effective_rate_percent: Decimal::ZERO,
                amount_due: Decimal::ZERO,
            });
        }

        let effective_rate =
            self.effective_rate(rbt12, bracket.nominal_rate, bracket.deduction)?;
        let amount_due = input
            .month_revenue
            .checked_mul(effective_rate)
            .and_then(|v| v.checked_div(ONE_HUNDRED))
            .map(round_half_up)
            .ok_or_else(out_of_range)?;

        Ok(TaxCalculationResult {
            nominal_rate_percent: bracket.nominal_rate,
            deduction_amount: bracket.deduction,
            effective_rate_percent: round_rate(effective_rate),
            amount_due,
        })
    }

    /// Effective rate in percent, unrounded and clamped at zero.
    ///
    /// `rbt12` must be non-zero.
    fn effective_rate(
        &self,
        rbt12: Decimal,
        nominal_rate: Decimal,
        deduction: Decimal,
    ) -> Result<Decimal, DasError> {
        rbt12
            .checked_mul(nominal_rate)
            .and_then(|v| v.checked_div(ONE_HUNDRED))
            .and_then(|nominal_tax| nominal_tax.checked_sub(deduction))
            .and_then(|v| v.checked_div(rbt12))
            .and_then(|v| max(Decimal::ZERO, v).checked_mul(ONE_HUNDRED))
            .ok_or_else(out_of_range)
    }
}

/// Calculates the DAS against the built-in Simples Nacional tables.
pub fn calculate_tax(input: &TaxCalculationInput) -> Result<TaxCalculationResult, DasError> {
    let schedule = BracketSchedule::simples_nacional();
    DasCalculator::new(&schedule).calculate(input)
}

fn out_of_range() -> DasError {
    DasError::InvalidInput("revenue out of range".to_string())
}

fn validate_non_negative(
    field: &str,
    value: Decimal,
) -> Result<(), DasError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DasError::InvalidInput(format!(
            "{field} must not be negative, got {value}"
        )));
    }
    Ok(())
}

fn validate_period_id(period_id: &str) -> Result<(), DasError> {
    let well_formed = period_id.len() == 7
        && NaiveDate::parse_from_str(&format!("{period_id}-01"), "%Y-%m-%d").is_ok();
    if !well_formed {
        return Err(DasError::InvalidInput(format!(
            "period must be in YYYY-MM form, got '{period_id}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{Anexo, BracketTable, TaxBracket};

    fn input(
        anexo: Anexo,
        month_revenue: Decimal,
        rbt12: Decimal,
    ) -> TaxCalculationInput {
        TaxCalculationInput {
            period_id: "2025-03".to_string(),
            category: anexo,
            month_revenue,
            trailing_twelve_month_revenue: rbt12,
        }
    }

    // =========================================================================
    // calculate tests
    // =========================================================================

    #[test]
    fn calculate_anexo_i_second_bracket() {
        let schedule = BracketSchedule::simples_nacional();
        let calculator = DasCalculator::new(&schedule);

        let result = calculator
            .calculate(&input(Anexo::I, dec!(30000), dec!(200000)))
            .unwrap();

        // ((200000 × 0.073) − 5940) / 200000 = 4.33%
        assert_eq!(
            result,
            TaxCalculationResult {
                nominal_rate_percent: dec!(7.3),
                deduction_amount: dec!(5940),
                effective_rate_percent: dec!(4.33),
                amount_due: dec!(1299.00),
            }
        );
    }

    #[test]
    fn calculate_first_bracket_effective_equals_nominal() {
        let result = calculate_tax(&input(Anexo::III, dec!(10000), dec!(120000))).unwrap();

        assert_eq!(result.effective_rate_percent, dec!(6.0));
        assert_eq!(result.amount_due, dec!(600.00));
    }

    #[test]
    fn calculate_rounds_effective_rate_to_four_places() {
        // ((190000 × 0.18) − 4500) / 190000 = 15.63157894...%
        let result = calculate_tax(&input(Anexo::V, dec!(10000), dec!(190000))).unwrap();

        assert_eq!(result.effective_rate_percent, dec!(15.6316));
        // Amount uses the unrounded rate: 10000 × 0.1563157894... = 1563.157894...
        assert_eq!(result.amount_due, dec!(1563.16));
    }

    #[test]
    fn calculate_every_anexo_picks_lower_bracket_on_boundary() {
        let schedule = BracketSchedule::simples_nacional();
        let calculator = DasCalculator::new(&schedule);

        for anexo in Anexo::ALL {
            let table = schedule.table(anexo).unwrap();
            for bracket in table.brackets() {
                let result = calculator
                    .calculate(&input(anexo, dec!(1000), bracket.upper_bound))
                    .unwrap();

                assert_eq!(
                    result.nominal_rate_percent, bracket.nominal_rate,
                    "Anexo {anexo} at {}",
                    bracket.upper_bound
                );
                assert_eq!(result.deduction_amount, bracket.deduction);
            }
        }
    }

    #[test]
    fn calculate_boundary_180000_uses_first_bracket() {
        let result = calculate_tax(&input(Anexo::I, dec!(15000), dec!(180000))).unwrap();

        assert_eq!(result.nominal_rate_percent, dec!(4.0));
        assert_eq!(result.deduction_amount, dec!(0));
    }

    #[test]
    fn calculate_revenue_above_all_brackets_uses_last() {
        let result = calculate_tax(&input(Anexo::II, dec!(500000), dec!(6000000))).unwrap();

        assert_eq!(result.nominal_rate_percent, dec!(30.0));
        assert_eq!(result.deduction_amount, dec!(720000));
        // ((6000000 × 0.30) − 720000) / 6000000 = 18%
        assert_eq!(result.effective_rate_percent, dec!(18));
        assert_eq!(result.amount_due, dec!(90000.00));
    }

    #[test]
    fn calculate_zero_rbt12_returns_zero_for_every_anexo() {
        for anexo in Anexo::ALL {
            let result = calculate_tax(&input(anexo, dec!(5000), Decimal::ZERO)).unwrap();

            assert_eq!(result.effective_rate_percent, Decimal::ZERO, "Anexo {anexo}");
            assert_eq!(result.amount_due, Decimal::ZERO, "Anexo {anexo}");
        }
    }

    #[test]
    fn calculate_clamps_negative_effective_rate() {
        let table = BracketTable::new(
            Anexo::IV,
            vec![
                TaxBracket::new(dec!(100), dec!(1), dec!(0)),
                TaxBracket::new(dec!(1000), dec!(5), dec!(100)),
            ],
        )
        .unwrap();
        let mut schedule = BracketSchedule::new();
        schedule.insert(table);

        // (150 × 0.05) − 100 < 0
        let result = DasCalculator::new(&schedule)
            .calculate(&input(Anexo::IV, dec!(50), dec!(150)))
            .unwrap();

        assert_eq!(result.effective_rate_percent, Decimal::ZERO);
        assert_eq!(result.amount_due, Decimal::ZERO);
    }

    #[test]
    fn calculate_is_idempotent() {
        let schedule = BracketSchedule::simples_nacional();
        let calculator = DasCalculator::new(&schedule);
        let input = input(Anexo::III, dec!(42123.45), dec!(987654.32));

        let first = calculator.calculate(&input).unwrap();
        let second = calculator.calculate(&input).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.amount_due.to_string(), second.amount_due.to_string());
        assert_eq!(
            first.effective_rate_percent.serialize(),
            second.effective_rate_percent.serialize()
        );
    }

    #[test]
    fn calculate_amount_due_is_monotonic_within_bracket() {
        let schedule = BracketSchedule::simples_nacional();
        let calculator = DasCalculator::new(&schedule);

        let mut previous = Decimal::ZERO;
        let mut rbt12 = dec!(180000.01);
        while rbt12 <= dec!(360000) {
            let result = calculator
                .calculate(&input(Anexo::I, dec!(20000), rbt12))
                .unwrap();
            assert!(
                result.amount_due >= previous,
                "amount due decreased at {rbt12}: {} < {previous}",
                result.amount_due
            );
            previous = result.amount_due;
            rbt12 += dec!(7500);
        }
    }

    #[test]
    fn calculate_steps_up_at_bracket_boundary() {
        let below = calculate_tax(&input(Anexo::I, dec!(20000), dec!(180000))).unwrap();
        let above = calculate_tax(&input(Anexo::I, dec!(20000), dec!(360000))).unwrap();

        assert!(above.amount_due > below.amount_due);
    }

    // =========================================================================
    // error tests
    // =========================================================================

    #[test]
    fn calculate_rejects_negative_month_revenue() {
        let result = calculate_tax(&input(Anexo::I, dec!(-1), dec!(1000)));

        assert!(matches!(
            result,
            Err(DasError::InvalidInput(msg)) if msg.contains("month_revenue")
        ));
    }

    #[test]
    fn calculate_rejects_negative_rbt12() {
        let result = calculate_tax(&input(Anexo::I, dec!(1), dec!(-1000)));

        assert!(matches!(
            result,
            Err(DasError::InvalidInput(msg)) if msg.contains("trailing_twelve_month_revenue")
        ));
    }

    #[test]
    fn calculate_rejects_malformed_period() {
        for period in ["2025-3", "2025-13", "March", "2025-03-01"] {
            let mut bad = input(Anexo::I, dec!(1), dec!(1));
            bad.period_id = period.to_string();

            assert!(
                matches!(calculate_tax(&bad), Err(DasError::InvalidInput(_))),
                "period {period} should be rejected"
            );
        }
    }

    #[test]
    fn calculate_rejects_revenue_beyond_decimal_range() {
        let expected = Err(DasError::InvalidInput("revenue out of range".to_string()));

        for anexo in Anexo::ALL {
            assert_eq!(
                calculate_tax(&input(anexo, dec!(1000), Decimal::MAX)),
                expected,
                "Anexo {anexo}"
            );
        }
        assert_eq!(
            calculate_tax(&input(Anexo::I, Decimal::MAX, dec!(200000))),
            expected
        );
    }

    #[test]
    fn calculate_rejects_anexo_missing_from_schedule() {
        let schedule = BracketSchedule::new();
        let result = DasCalculator::new(&schedule).calculate(&input(Anexo::V, dec!(1), dec!(1)));

        assert_eq!(result, Err(DasError::UnknownCategory("V".to_string())));
    }
}
