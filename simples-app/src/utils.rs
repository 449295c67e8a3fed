use rust_decimal::Decimal;
use simples_core::parse_decimal_text;
use thiserror::Error;

/// Error returned when a string cannot be parsed as a [`Decimal`].
#[derive(Debug, Error)]
#[error("invalid decimal '{input}': {source}")]
pub struct ParseDecimalError {
    input: String,
    #[source]
    source: rust_decimal::Error,
}

/// Parses an amount written as `1234.56` or in Brazilian notation
/// (`1.234,56`). Empty input is treated as 0.
pub fn parse_decimal(s: &str) -> Result<Decimal, ParseDecimalError> {
    if s.trim().is_empty() {
        return Ok(Decimal::ZERO);
    }
    parse_decimal_text(s).map_err(|e| {
        tracing::error!(input = %s, "invalid decimal: {}", e);
        ParseDecimalError {
            input: s.to_string(),
            source: e,
        }
    })
}

/// Like [`parse_decimal`], rejecting negative amounts. Used for revenue
/// arguments.
pub fn parse_revenue(s: &str) -> Result<Decimal, String> {
    let value = parse_decimal(s).map_err(|e| e.to_string())?;
    if value < Decimal::ZERO {
        return Err(format!("revenue must not be negative, got {value}"));
    }
    Ok(value)
}
