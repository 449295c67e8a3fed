use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Anexo;

/// Input of a monthly DAS calculation (PGDAS-D).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationInput {
    /// Competência in `YYYY-MM` form.
    #[serde(alias = "competencia")]
    pub period_id: String,

    #[serde(alias = "anexo")]
    pub category: Anexo,

    /// Gross revenue of the month being assessed.
    #[serde(alias = "receitaBrutaMes")]
    pub month_revenue: Decimal,

    /// Gross revenue of the trailing twelve months (RBT12), used to pick the
    /// bracket.
    #[serde(alias = "receitaBruta12m")]
    pub trailing_twelve_month_revenue: Decimal,
}

/// Outcome of a DAS calculation. Derived from the input, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationResult {
    /// Nominal rate of the matched bracket, in percent.
    pub nominal_rate_percent: Decimal,

    /// Deduction ("parcela a deduzir") of the matched bracket.
    pub deduction_amount: Decimal,

    /// Effective rate in percent, rounded to four decimal places.
    pub effective_rate_percent: Decimal,

    /// DAS amount due, rounded to cents.
    pub amount_due: Decimal,
}
