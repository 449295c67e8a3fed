use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use simples_core::{
    BracketSchedule, Clock, CompanyConfig, DasCalculator, DataKind, DefisInput, EncodedFile,
    LedgerRecord, RegulatoryBook, SourceConfig, SourceRegistry, SpedKind, TaxCalculationInput,
    TaxCalculationResult, ValidationReport, calculations::common::format_amount, encode,
    render_defis, render_pgdas_summary, validate,
};
use simples_data::{ExportFormat, JsonSourceFactory, export_records};
use tracing::{debug, info};

/// Build a [`SourceRegistry`] with every provider compiled into this binary.
pub fn build_registry() -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    registry.register(Box::new(JsonSourceFactory));
    registry
}

/// One calculated competência, as emitted by `das --json` and `das-batch --json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DasOutcome {
    #[serde(flatten)]
    pub input: TaxCalculationInput,
    #[serde(flatten)]
    pub result: TaxCalculationResult,
}

/// Calculate a single competência.
pub fn calculate(
    schedule: &BracketSchedule,
    input: TaxCalculationInput,
) -> Result<DasOutcome> {
    let result = DasCalculator::new(schedule)
        .calculate(&input)
        .with_context(|| format!("cannot calculate DAS for {}", input.period_id))?;
    Ok(DasOutcome { input, result })
}

/// Calculate every row; the first failing row aborts the batch.
pub fn calculate_batch(
    schedule: &BracketSchedule,
    inputs: Vec<TaxCalculationInput>,
) -> Result<Vec<DasOutcome>> {
    let calculator = DasCalculator::new(schedule);
    inputs
        .into_iter()
        .enumerate()
        .map(|(idx, input)| {
            let result = calculator
                .calculate(&input)
                .with_context(|| format!("row {}: period {}", idx + 1, input.period_id))?;
            Ok(DasOutcome { input, result })
        })
        .collect()
}

/// PGDAS-D summary text, or pretty JSON.
pub fn render_outcome(
    outcome: &DasOutcome,
    json: bool,
) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(outcome).context("cannot serialize result");
    }
    Ok(render_pgdas_summary(&outcome.input, &outcome.result))
}

/// One line per competência, or a pretty JSON array.
pub fn render_batch(
    outcomes: &[DasOutcome],
    json: bool,
) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(outcomes).context("cannot serialize results");
    }

    let mut out = String::new();
    let mut total = rust_decimal::Decimal::ZERO;
    for o in outcomes {
        total += o.result.amount_due;
        writeln!(
            out,
            "{:<8} {:<4} {:>10}% {:>14}",
            o.input.period_id,
            o.input.category.as_str(),
            o.result.effective_rate_percent.normalize().to_string(),
            format_amount(o.result.amount_due)
        )?;
    }
    writeln!(out, "{:<25} {:>14}", "Total", format_amount(total))?;
    Ok(out)
}

/// Replace the book's company with the configured one, if any.
pub fn apply_company(
    book: &mut RegulatoryBook,
    company: Option<&CompanyConfig>,
) {
    if let Some(company) = company {
        if *company != book.company {
            info!(legal_name = %company.legal_name, "using company from configuration");
            book.company = company.clone();
        }
    }
}

pub fn defis_text(input: &DefisInput) -> Result<String> {
    render_defis(input).context("cannot render DEFIS")
}

/// Encode `book`; the result is checked with the structural validator before
/// it is returned.
pub fn encode_book(
    book: &RegulatoryBook,
    clock: &dyn Clock,
) -> Result<EncodedFile> {
    let file = encode(book, clock)
        .with_context(|| format!("cannot encode {} book", book.document_type))?;

    let report = validate(&file.to_text(), book.document_type);
    if !report.valid {
        anyhow::bail!("encoded file failed validation: {}", report.errors.join("; "));
    }
    Ok(file)
}

pub fn validate_text(
    text: &str,
    kind: SpedKind,
) -> ValidationReport {
    let report = validate(text, kind);
    info!(%kind, valid = report.valid, errors = report.errors.len(), "validated SPED file");
    report
}

pub fn export_book(
    book: &RegulatoryBook,
    format: ExportFormat,
    title: &str,
    generated_at: NaiveDateTime,
) -> Result<String> {
    export_records(&book.records, format, title, generated_at)
        .with_context(|| format!("cannot export {} records as {format}", book.records.len()))
}

/// Fetch one record family through the registry.
pub async fn fetch_records(
    registry: &SourceRegistry,
    config: &SourceConfig,
    kind: DataKind,
) -> Result<Vec<LedgerRecord>> {
    debug!(provider = %config.provider, %kind, "fetching");
    let source = registry
        .create(config)
        .await
        .with_context(|| format!("cannot open {} source", config.provider))?;
    source
        .test_connection()
        .await
        .with_context(|| format!("{} source is unreachable", config.provider))?;
    source
        .fetch_records(kind)
        .await
        .with_context(|| format!("cannot fetch {kind} records"))
}

/// Write `content` to `path`, or to stdout when no path is given.
pub fn write_output(
    path: Option<&Path>,
    content: &str,
) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("cannot write {}", path.display()))?;
            info!(path = %path.display(), bytes = content.len(), "wrote output");
        }
        None => print!("{content}"),
    }
    Ok(())
}
