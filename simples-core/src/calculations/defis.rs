//! DEFIS, the annual socioeconomic and fiscal declaration of a Simples
//! Nacional company.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::calculations::common::format_amount;
use crate::models::DefisInput;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Renders the declaration text.
///
/// Accounting profit may be negative (a loss); revenue and distributed profit
/// may not.
pub fn render_defis(input: &DefisInput) -> Result<String, DefisError> {
    ensure_non_negative("annual_gross_revenue", input.annual_gross_revenue)?;
    ensure_non_negative("distributed_profit", input.distributed_profit)?;

    Ok([
        "DEFIS - Declaração de Informações Socioeconômicas e Fiscais".to_string(),
        format!("Ano-calendário: {}", input.calendar_year),
        format!(
            "Receita bruta anual: R$ {}",
            format_amount(input.annual_gross_revenue)
        ),
        format!("Lucro contábil: R$ {}", format_amount(input.accounting_profit)),
        format!(
            "Distribuição de lucros: R$ {}",
            format_amount(input.distributed_profit)
        ),
        format!("Empregados em 31/12: {}", input.employees_at_year_end),
    ]
    .join("\n"))
}

pub fn defis_file_name(calendar_year: i32) -> String {
    format!("DEFIS_{calendar_year}.txt")
}

fn ensure_non_negative(
    field: &str,
    value: Decimal,
) -> Result<(), DefisError> {
    if value < Decimal::ZERO {
        return Err(DefisError::InvalidInput(format!(
            "{field} must not be negative, got {value}"
        )));
    }
    Ok(())
}
