//! CSV loader for batches of monthly DAS calculations.
//!
//! ## CSV Format
//!
//! Columns are matched by header name; order does not matter.
//!
//! | Column          | Type    | Notes                                  |
//! |-----------------|---------|----------------------------------------|
//! | `period_id`     | string  | Competência, `YYYY-MM`                 |
//! | `anexo`         | string  | `I` to `V`, case-insensitive           |
//! | `month_revenue` | decimal | `30000.00` or Brazilian `30.000,00`    |
//! | `rbt12`         | decimal | Trailing twelve-month gross revenue    |
//!
//! ```csv
//! period_id,anexo,month_revenue,rbt12
//! 2025-01,I,30000.00,200000.00
//! 2025-02,III,"12.500,00","410.000,00"
//! ```
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use simples_core::{Anexo, TaxCalculationInput, parse_decimal_text};

#[derive(Debug, Deserialize)]
struct CsvRow {
    period_id: String,
    anexo: String,
    #[serde(deserialize_with = "deserialize_amount")]
    month_revenue: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    rbt12: Decimal,
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_decimal_text(&s)
        .map_err(|e| serde::de::Error::custom(format!("invalid amount '{s}': {e}")))
}

/// Errors that can occur while loading DAS input rows.
#[derive(Debug, thiserror::Error)]
pub enum CsvLoadError {
    /// Bad structure, missing column or malformed amount.
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    /// `row` is 1-based (header excluded).
    #[error("unrecognised Anexo '{anexo}' on row {row}")]
    InvalidAnexo { anexo: String, row: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn convert_row(
    row: CsvRow,
    row_number: usize,
) -> Result<TaxCalculationInput, CsvLoadError> {
    let category = Anexo::parse(&row.anexo).ok_or(CsvLoadError::InvalidAnexo {
        anexo: row.anexo,
        row: row_number,
    })?;

    Ok(TaxCalculationInput {
        period_id: row.period_id,
        category,
        month_revenue: row.month_revenue,
        trailing_twelve_month_revenue: row.rbt12,
    })
}

/// Parse CSV text into calculation inputs, in file order.
pub fn load_from_str(input: &str) -> Result<Vec<TaxCalculationInput>, CsvLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input.as_bytes());

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(idx, result)| convert_row(result?, idx + 1))
        .collect()
}

/// Read a file from disk and delegate to [`load_from_str`].
pub fn load_from_file(path: &Path) -> Result<Vec<TaxCalculationInput>, CsvLoadError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}
