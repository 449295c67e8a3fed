use std::io::Read;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use simples_core::{Anexo, BracketSchedule, BracketTable, BracketTableError, TaxBracket};
use thiserror::Error;
use tracing::info;

/// Errors that can occur when loading bracket tables.
#[derive(Debug, Error)]
pub enum BracketLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("unrecognised Anexo '{anexo}' on row {row}")]
    InvalidAnexo { anexo: String, row: usize },

    #[error("Invalid table: {0}")]
    InvalidTable(#[from] BracketTableError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for BracketLoaderError {
    fn from(err: csv::Error) -> Self {
        BracketLoaderError::CsvParse(err.to_string())
    }
}

/// A single row of the bracket CSV file.
///
/// - `anexo`: roman-numeral category (I to V)
/// - `upper_bound`: RBT12 ceiling of the bracket, inclusive
/// - `nominal_rate`: nominal rate in percent (e.g. `7.3`)
/// - `deduction`: "parcela a deduzir" in reais
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BracketRecord {
    pub anexo: String,
    pub upper_bound: Decimal,
    pub nominal_rate: Decimal,
    pub deduction: Decimal,
}

/// Loader for replacement rate tables, used when the legislation changes
/// ahead of a release.
pub struct BracketLoader;

impl BracketLoader {
    /// Parse bracket rows from a CSV reader, in file order.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<BracketRecord>, BracketLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: BracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Group rows by Anexo, preserving file order within each group, and
    /// build a validated schedule.
    ///
    /// Only the Anexos present in the file are included; callers wanting a
    /// partial override can merge the result into
    /// [`BracketSchedule::simples_nacional`].
    pub fn build_schedule(
        records: &[BracketRecord],
    ) -> Result<BracketSchedule, BracketLoaderError> {
        let mut groups: Vec<(Anexo, Vec<TaxBracket>)> = Vec::new();

        for (idx, record) in records.iter().enumerate() {
            let anexo = Anexo::parse(&record.anexo).ok_or_else(|| BracketLoaderError::InvalidAnexo {
                anexo: record.anexo.clone(),
                row: idx + 1,
            })?;
            let bracket =
                TaxBracket::new(record.upper_bound, record.nominal_rate, record.deduction);

            match groups.iter_mut().find(|(a, _)| *a == anexo) {
                Some((_, brackets)) => brackets.push(bracket),
                None => groups.push((anexo, vec![bracket])),
            }
        }

        let mut schedule = BracketSchedule::new();
        for (anexo, brackets) in groups {
            schedule.insert(BracketTable::new(anexo, brackets)?);
        }
        Ok(schedule)
    }

    /// Read a bracket CSV from disk and build its schedule.
    pub fn load_from_file(path: &Path) -> Result<BracketSchedule, BracketLoaderError> {
        let file = std::fs::File::open(path)?;
        let records = Self::parse(file)?;
        let schedule = Self::build_schedule(&records)?;
        info!(
            path = %path.display(),
            rows = records.len(),
            anexos = ?schedule.anexos(),
            "loaded bracket tables"
        );
        Ok(schedule)
    }
}
