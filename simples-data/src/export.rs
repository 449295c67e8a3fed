//! Tabular export of book records (CSV, spreadsheet TSV, plain-text report).

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use simples_core::LedgerRecord;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format '{0}' (expected csv, tsv or text)")]
    UnknownFormat(String),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated, every cell quoted.
    Csv,
    /// Tab-separated, for spreadsheets.
    Tsv,
    /// Human-readable report with a title and a generation timestamp.
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Text => "txt",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" | "excel" | "xls" => Ok(Self::Tsv),
            "text" | "txt" | "pdf" => Ok(Self::Text),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Text => "text",
        })
    }
}

type Column = (&'static str, fn(&LedgerRecord) -> Option<String>);

static COLUMNS: [Column; 12] = [
    ("conta", |r| r.account.clone()),
    ("descricao", |r| r.description.clone()),
    ("nivel", |r| r.level.clone()),
    ("saldo", |r| r.balance.map(|d| d.to_string())),
    ("data", |r| r.date.map(|d| d.format("%d/%m/%Y").to_string())),
    ("valor", |r| r.amount.map(|d| d.to_string())),
    ("tipo", |r| r.kind.map(|k| k.as_str().to_string())),
    ("historico", |r| r.memo.clone()),
    ("numero", |r| r.document_number.clone()),
    ("base_calculo", |r| r.tax_base.map(|d| d.to_string())),
    ("valor_pis", |r| r.pis_amount.map(|d| d.to_string())),
    ("valor_cofins", |r| r.cofins_amount.map(|d| d.to_string())),
];

/// Columns populated in at least one record, in a fixed order.
fn active_columns(records: &[LedgerRecord]) -> Vec<&'static Column> {
    COLUMNS
        .iter()
        .filter(|(_, get)| records.iter().any(|r| get(r).is_some()))
        .collect()
}

fn rows(
    records: &[LedgerRecord],
    columns: &[&'static Column],
) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|r| columns.iter().map(|(_, get)| get(r).unwrap_or_default()).collect())
        .collect()
}

/// Renders `records` in `format`.
///
/// The header lists only fields that are present in at least one record;
/// missing cells are empty. An empty record list yields an empty CSV/TSV
/// body and a header-less text report.
pub fn export_records(
    records: &[LedgerRecord],
    format: ExportFormat,
    title: &str,
    generated_at: NaiveDateTime,
) -> Result<String, ExportError> {
    let columns = active_columns(records);
    let header: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let rows = rows(records, &columns);

    let output = match format {
        ExportFormat::Csv => delimited(&header, &rows, b',', csv::QuoteStyle::Always)?,
        ExportFormat::Tsv => delimited(&header, &rows, b'\t', csv::QuoteStyle::Never)?,
        ExportFormat::Text => report(&header, &rows, title, generated_at),
    };

    info!(%format, records = records.len(), "exported records");
    Ok(output)
}

fn delimited(
    header: &[&str],
    rows: &[Vec<String>],
    delimiter: u8,
    quote_style: csv::QuoteStyle,
) -> Result<String, ExportError> {
    if rows.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(quote_style)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn report(
    header: &[&str],
    rows: &[Vec<String>],
    title: &str,
    generated_at: NaiveDateTime,
) -> String {
    let header_line = header.join(" | ");
    let mut out = format!(
        "{title}\n\nRelatório gerado em: {}\n\n",
        generated_at.format("%d/%m/%Y %H:%M:%S")
    );
    out.push_str(&header_line);
    out.push('\n');
    out.push_str(&"-".repeat(header_line.chars().count()));
    out.push('\n');
    for row in rows {
        out.push_str(&row.join(" | "));
        out.push('\n');
    }
    out
}

/// File name for an export: whitespace in the title becomes `_`.
pub fn export_file_name(
    title: &str,
    format: ExportFormat,
) -> String {
    let stem: Vec<&str> = title.split_whitespace().collect();
    format!("{}.{}", stem.join("_"), format.extension())
}
