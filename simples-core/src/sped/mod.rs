//! SPED (Sistema Público de Escrituração Digital) file generation.
//!
//! Three books are supported, each a sequence of pipe-delimited registers
//! (`|CODE|field|...|`) opened by `0000` and closed by `9999`:
//!
//! | Book | Content |
//! |------|---------|
//! | ECD  | chart of accounts, balances and journal entries |
//! | ECF  | revenue and expense lines for the income computation |
//! | EFD-Contribuições | fiscal documents with PIS/COFINS |

mod ecd;
mod ecf;
mod efd;
pub mod format;
mod validate;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::clock::Clock;
use crate::models::{CompanyConfig, LedgerRecord, RegulatoryBook};
use format::RegisterWriter;

pub use validate::{ValidationReport, validate};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpedError {
    #[error("unsupported SPED format: {0}")]
    UnsupportedFormat(String),

    #[error("company field '{0}' is required")]
    MissingCompanyField(&'static str),

    #[error("bookkeeping period starts on {start} after it ends on {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
}

/// Book type of a SPED file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SpedKind {
    Ecd,
    Ecf,
    EfdContribuicoes,
}

impl SpedKind {
    pub const ALL: [SpedKind; 3] = [SpedKind::Ecd, SpedKind::Ecf, SpedKind::EfdContribuicoes];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ecd => "ECD",
            Self::Ecf => "ECF",
            Self::EfdContribuicoes => "EFD_CONTRIBUICOES",
        }
    }

    /// Register whose presence identifies the book type.
    pub fn marker(&self) -> &'static str {
        self.layout().marker()
    }

    fn layout(&self) -> &'static dyn BookLayout {
        match self {
            Self::Ecd => &ecd::EcdLayout,
            Self::Ecf => &ecf::EcfLayout,
            Self::EfdContribuicoes => &efd::EfdLayout,
        }
    }
}

impl FromStr for SpedKind {
    type Err = SpedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "ECD" => Ok(Self::Ecd),
            "ECF" => Ok(Self::Ecf),
            "EFD_CONTRIBUICOES" | "EFD" => Ok(Self::EfdContribuicoes),
            _ => Err(SpedError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for SpedKind {
    type Error = SpedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SpedKind> for String {
    fn from(kind: SpedKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for SpedKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Register layout of one book type.
///
/// The encoder writes the opening registers, one group of body registers per
/// record, then the shared `9999` closing register.
trait BookLayout: Sync {
    fn marker(&self) -> &'static str;

    fn write_opening(
        &self,
        company: &CompanyConfig,
        today: NaiveDate,
        out: &mut RegisterWriter,
    );

    /// `index` is one-based.
    fn write_record(
        &self,
        index: usize,
        record: &LedgerRecord,
        out: &mut RegisterWriter,
    );
}

/// An encoded SPED file, one register per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFile {
    kind: SpedKind,
    lines: Vec<String>,
}

impl EncodedFile {
    pub fn kind(&self) -> SpedKind {
        self.kind
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Each line followed by `\n`.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Suggested file name, e.g. `SPED_ECD_20250314.txt`.
    pub fn file_name(
        &self,
        today: NaiveDate,
    ) -> String {
        format!("SPED_{}_{}.txt", self.kind, format::format_date(today))
    }
}

impl fmt::Display for EncodedFile {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Encodes books using a clock for the generation date.
pub struct SpedEncoder<'a> {
    clock: &'a dyn Clock,
}

impl<'a> SpedEncoder<'a> {
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self { clock }
    }

    /// Encodes `book` into register lines.
    ///
    /// Records are written in input order and never skipped: a missing field
    /// takes its register's placeholder value.
    ///
    /// # Errors
    ///
    /// Returns an error when the company identification is incomplete or its
    /// period is inverted.
    pub fn encode(
        &self,
        book: &RegulatoryBook,
    ) -> Result<EncodedFile, SpedError> {
        book.company.validate()?;

        let layout = book.document_type.layout();
        let mut out = RegisterWriter::new();

        layout.write_opening(&book.company, self.clock.today(), &mut out);
        for (i, record) in book.records.iter().enumerate() {
            layout.write_record(i + 1, record, &mut out);
        }
        let lines = out.close();

        info!(
            kind = %book.document_type,
            records = book.records.len(),
            lines = lines.len(),
            "encoded SPED file"
        );

        Ok(EncodedFile {
            kind: book.document_type,
            lines,
        })
    }
}

/// Shorthand for [`SpedEncoder::encode`].
pub fn encode(
    book: &RegulatoryBook,
    clock: &dyn Clock,
) -> Result<EncodedFile, SpedError> {
    SpedEncoder::new(clock).encode(book)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::clock::FixedClock;
    use crate::models::RecordKind;

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap())
    }

    fn company() -> CompanyConfig {
        CompanyConfig {
            tax_id: "12345678000190".to_string(),
            legal_name: "Padaria Exemplo LTDA".to_string(),
            state_registration: Some("123456789".to_string()),
            municipality: "Campinas".to_string(),
            state_code: "SP".to_string(),
            period_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        }
    }

    fn book(
        kind: SpedKind,
        records: Vec<LedgerRecord>,
    ) -> RegulatoryBook {
        RegulatoryBook {
            document_type: kind,
            records,
            company: company(),
        }
    }

    fn numbered_records(count: usize) -> Vec<LedgerRecord> {
        (0..count)
            .map(|i| LedgerRecord {
                account: Some(format!("1.1.{i:04}")),
                date: NaiveDate::from_ymd_opt(2024, 6, 1),
                amount: Some(dec!(10.5)),
                kind: Some(RecordKind::Revenue),
                document_number: Some(i.to_string()),
                ..LedgerRecord::default()
            })
            .collect()
    }

    // =========================================================================
    // SpedKind tests
    // =========================================================================

    #[test]
    fn sped_kind_parses_names() {
        assert_eq!("ECD".parse::<SpedKind>(), Ok(SpedKind::Ecd));
        assert_eq!(" ecf ".parse::<SpedKind>(), Ok(SpedKind::Ecf));
        assert_eq!(
            "efd-contribuicoes".parse::<SpedKind>(),
            Ok(SpedKind::EfdContribuicoes)
        );
    }

    #[test]
    fn sped_kind_rejects_unknown_name() {
        assert_eq!(
            "NFE".parse::<SpedKind>(),
            Err(SpedError::UnsupportedFormat("NFE".to_string()))
        );
    }

    #[test]
    fn sped_kind_serializes_as_upper_snake() {
        let json = serde_json::to_string(&SpedKind::EfdContribuicoes).unwrap();

        assert_eq!(json, "\"EFD_CONTRIBUICOES\"");
    }

    // =========================================================================
    // encode tests
    // =========================================================================

    #[test]
    fn encode_empty_ecd_has_opening_and_closing_only() {
        let file = encode(&book(SpedKind::Ecd, vec![]), &clock()).unwrap();

        assert_eq!(
            file.to_text(),
            "|0000|014|0|20250314|20250314|Padaria Exemplo LTDA|12345678000190|SP|123456789|Campinas|G||\n\
             |0001|0|\n\
             |0007|12345678000190|123456789|Padaria Exemplo LTDA|Campinas|SP|\n\
             |0020|20240101|20241231|3|1|N|1,00||\n\
             |9999|5|\n"
        );
    }

    #[test]
    fn closing_count_matches_line_count() {
        for kind in SpedKind::ALL {
            for count in [0, 1, 500] {
                let file = encode(&book(kind, numbered_records(count)), &clock()).unwrap();
                let last = file.lines().last().unwrap();

                assert_eq!(
                    last,
                    &format!("|9999|{}|", file.line_count()),
                    "{kind} with {count} records"
                );
            }
        }
    }

    #[test]
    fn encode_output_passes_validation() {
        for kind in SpedKind::ALL {
            for count in [0, 1, 25] {
                let file = encode(&book(kind, numbered_records(count)), &clock()).unwrap();

                let report = validate(&file.to_text(), kind);

                assert_eq!(report, ValidationReport::ok(), "{kind} with {count} records");
            }
        }
    }

    #[test]
    fn encode_preserves_record_order() {
        let file = encode(
            &book(SpedKind::EfdContribuicoes, numbered_records(3)),
            &clock(),
        )
        .unwrap();

        let numbers: Vec<&str> = file
            .lines()
            .iter()
            .filter(|l| l.starts_with("|A100|"))
            .map(|l| l.split('|').nth(5).unwrap())
            .collect();

        assert_eq!(numbers, vec!["0", "1", "2"]);
    }

    #[test]
    fn encode_never_drops_sparse_records() {
        for kind in SpedKind::ALL {
            let records = vec![LedgerRecord::default(); 4];
            let file = encode(&book(kind, records), &clock()).unwrap();
            let empty = encode(&book(kind, vec![]), &clock()).unwrap();

            assert!(
                file.line_count() >= empty.line_count() + 4,
                "{kind} dropped records"
            );
        }
    }

    #[test]
    fn encode_keeps_embedded_breaks_and_pipes_inside_fields() {
        let records = vec![
            LedgerRecord {
                description: Some("Venda\nbalcao".to_string()),
                amount: Some(dec!(10)),
                kind: Some(RecordKind::Revenue),
                ..LedgerRecord::default()
            },
            LedgerRecord {
                description: Some("A|B".to_string()),
                amount: Some(dec!(10)),
                kind: Some(RecordKind::Revenue),
                ..LedgerRecord::default()
            },
        ];
        let mut book = book(SpedKind::Ecf, records);
        book.company.legal_name = "Padaria\r\nExemplo".to_string();

        let file = encode(&book, &clock()).unwrap();
        let text = file.to_text();

        assert_eq!(text.lines().count(), file.line_count());
        assert_eq!(
            text.lines().last(),
            Some(format!("|9999|{}|", text.lines().count()).as_str())
        );
        let revenue: Vec<&str> = text.lines().filter(|l| l.starts_with("|X290|")).collect();
        assert_eq!(revenue, vec!["|X290|10,00|Venda balcao|", "|X290|10,00|A B|"]);
        assert!(validate(&text, SpedKind::Ecf).valid);
    }

    #[test]
    fn encode_rejects_incomplete_company() {
        let mut book = book(SpedKind::Ecf, vec![]);
        book.company.tax_id.clear();

        assert_eq!(
            encode(&book, &clock()),
            Err(SpedError::MissingCompanyField("tax_id"))
        );
    }

    #[test]
    fn file_name_includes_kind_and_date() {
        let file = encode(&book(SpedKind::Ecf, vec![]), &clock()).unwrap();

        assert_eq!(file.file_name(clock().today()), "SPED_ECF_20250314.txt");
    }
}
