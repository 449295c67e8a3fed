//! Plain-text summary of a DAS calculation, as filed alongside the PGDAS-D.

use crate::calculations::common::format_amount;
use crate::models::{TaxCalculationInput, TaxCalculationResult};

/// Renders the calculation summary, one `label: value` line per field.
///
/// Rates are written without trailing zeros (`4.33%`), amounts with two
/// decimals. Lines are joined with `\n` and there is no trailing newline.
pub fn render_pgdas_summary(
    input: &TaxCalculationInput,
    result: &TaxCalculationResult,
) -> String {
    [
        "PGDAS-D - Resumo do Cálculo".to_string(),
        format!("Competência: {}", input.period_id),
        format!("Anexo: {}", input.category),
        format!("Receita do mês: R$ {}", format_amount(input.month_revenue)),
        format!(
            "RBT12: R$ {}",
            format_amount(input.trailing_twelve_month_revenue)
        ),
        format!("Alíquota nominal: {}%", result.nominal_rate_percent.normalize()),
        format!("Parcela a deduzir: R$ {}", format_amount(result.deduction_amount)),
        format!("Alíquota efetiva: {}%", result.effective_rate_percent.normalize()),
        format!("DAS devido: R$ {}", format_amount(result.amount_due)),
    ]
    .join("\n")
}

/// `PGDAS_202503.txt` for period `2025-03`.
pub fn pgdas_file_name(period_id: &str) -> String {
    format!("PGDAS_{}.txt", period_id.replacen('-', "", 1))
}
