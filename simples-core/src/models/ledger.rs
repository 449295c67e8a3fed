use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::CompanyConfig;
use crate::sped::SpedKind;

/// Classification carried by the upstream `tipo` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    #[serde(rename = "credito")]
    Credit,
    #[serde(rename = "debito")]
    Debit,
    #[serde(rename = "receita")]
    Revenue,
    #[serde(rename = "despesa")]
    Expense,
    #[serde(rename = "pis_cofins")]
    PisCofins,
    #[serde(rename = "outro")]
    #[serde(other)]
    Other,
}

impl RecordKind {
    /// Upstream `tipo` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credito",
            Self::Debit => "debito",
            Self::Revenue => "receita",
            Self::Expense => "despesa",
            Self::PisCofins => "pis_cofins",
            Self::Other => "outro",
        }
    }
}

/// A ledger line as synchronized from an ERP.
///
/// Which fields are populated depends on the book the record is destined for
/// (accounting entry, revenue/expense line, or fiscal document line). Every
/// field is optional and malformed values deserialize to `None`, so a single
/// noisy record never rejects the whole book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    #[serde(
        default,
        alias = "conta",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none",
    )]
    pub account: Option<String>,

    #[serde(
        default,
        alias = "descricao",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none",
    )]
    pub description: Option<String>,

    /// Chart-of-accounts level.
    #[serde(
        default,
        alias = "nivel",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none",
    )]
    pub level: Option<String>,

    #[serde(
        default,
        alias = "saldo",
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none",
    )]
    pub balance: Option<Decimal>,

    #[serde(
        default,
        alias = "data",
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none",
    )]
    pub date: Option<NaiveDate>,

    #[serde(
        default,
        alias = "valor",
        alias = "value",
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none",
    )]
    pub amount: Option<Decimal>,

    #[serde(
        default,
        alias = "tipo",
        alias = "type",
        deserialize_with = "lenient_kind",
        skip_serializing_if = "Option::is_none",
    )]
    pub kind: Option<RecordKind>,

    /// Free-text history of an accounting entry.
    #[serde(
        default,
        alias = "historico",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none",
    )]
    pub memo: Option<String>,

    #[serde(
        default,
        alias = "numero",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none",
    )]
    pub document_number: Option<String>,

    #[serde(
        default,
        alias = "baseCalculo",
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none",
    )]
    pub tax_base: Option<Decimal>,

    #[serde(
        default,
        alias = "valorPIS",
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none",
    )]
    pub pis_amount: Option<Decimal>,

    #[serde(
        default,
        alias = "valorCOFINS",
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none",
    )]
    pub cofins_amount: Option<Decimal>,
}

/// A set of ledger records bound for one SPED file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatoryBook {
    #[serde(alias = "type")]
    pub document_type: SpedKind,

    #[serde(default, alias = "data", deserialize_with = "lenient_records")]
    pub records: Vec<LedgerRecord>,

    #[serde(alias = "config")]
    pub company: CompanyConfig,
}

/// Record families exposed by an ERP provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Sales,
    Purchases,
    Inventory,
    Financial,
}

impl DataKind {
    pub const ALL: [DataKind; 4] = [
        DataKind::Sales,
        DataKind::Purchases,
        DataKind::Inventory,
        DataKind::Financial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Purchases => "purchases",
            Self::Inventory => "inventory",
            Self::Financial => "financial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sales" => Some(Self::Sales),
            "purchases" => Some(Self::Purchases),
            "inventory" => Some(Self::Inventory),
            "financial" => Some(Self::Financial),
            _ => None,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Lenient field parsing
// ---------------------------------------------------------------------------

/// Parses a decimal written either as `1234.56` or in Brazilian notation
/// (`1.234,56`). Surrounding whitespace is ignored.
pub fn parse_decimal_text(s: &str) -> Result<Decimal, rust_decimal::Error> {
    let trimmed = s.trim();
    if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".").parse()
    } else {
        trimmed.parse()
    }
}

/// Parses `YYYY-MM-DD`, `YYYYMMDD`, `DD/MM/YYYY`, or an RFC 3339 timestamp
/// (keeping only its date part).
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    ["%Y-%m-%d", "%Y%m%d", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            trimmed
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDecimal {
    Number(Decimal),
    Text(String),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Text(String),
    Integer(i64),
    Float(f64),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecord {
    Record(LedgerRecord),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKind {
    Kind(RecordKind),
    Other(IgnoredAny),
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<RawDecimal>::deserialize(deserializer)? {
        None => None,
        Some(RawDecimal::Number(d)) => Some(d),
        Some(RawDecimal::Text(s)) if s.trim().is_empty() => None,
        Some(RawDecimal::Text(s)) => match parse_decimal_text(&s) {
            Ok(d) => Some(d),
            Err(e) => {
                warn!(input = %s, "ignoring malformed amount: {}", e);
                None
            }
        },
        Some(RawDecimal::Other(_)) => {
            warn!("ignoring non-numeric amount");
            None
        }
    };
    Ok(value)
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<RawText>::deserialize(deserializer)? {
        None => None,
        Some(RawText::Text(s)) if s.trim().is_empty() => None,
        Some(RawText::Text(s)) => Some(s),
        Some(RawText::Integer(n)) => Some(n.to_string()),
        Some(RawText::Float(n)) => Some(n.to_string()),
        Some(RawText::Other(_)) => {
            warn!("ignoring non-scalar text field");
            None
        }
    };
    Ok(value)
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<RawText>::deserialize(deserializer)? {
        Some(RawText::Text(s)) if !s.trim().is_empty() => {
            let parsed = parse_date_text(&s);
            if parsed.is_none() {
                warn!(input = %s, "ignoring malformed date");
            }
            parsed
        }
        _ => None,
    };
    Ok(value)
}

/// Deserializes a record list where an element that is not an object
/// (`null`, a string, a number) becomes an empty record instead of failing
/// the whole list. Positions are preserved.
pub fn lenient_records<'de, D>(deserializer: D) -> Result<Vec<LedgerRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<RawRecord>::deserialize(deserializer)?;
    let records = raw
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| match raw {
            RawRecord::Record(record) => record,
            RawRecord::Other(_) => {
                warn!(index = idx, "replacing non-object record with an empty one");
                LedgerRecord::default()
            }
        })
        .collect();
    Ok(records)
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<Option<RecordKind>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawKind>::deserialize(deserializer)? {
        Some(RawKind::Kind(kind)) => Some(kind),
        Some(RawKind::Other(_)) => Some(RecordKind::Other),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // parse helpers
    // =========================================================================

    #[test]
    fn parse_decimal_text_accepts_both_notations() {
        assert_eq!(parse_decimal_text("1234.56").unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal_text("1.234,56").unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal_text(" -5,5 ").unwrap(), dec!(-5.5));
        assert!(parse_decimal_text("abc").is_err());
    }

    #[test]
    fn parse_date_text_accepts_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5);

        assert_eq!(parse_date_text("2024-03-05"), expected);
        assert_eq!(parse_date_text("20240305"), expected);
        assert_eq!(parse_date_text("05/03/2024"), expected);
        assert_eq!(parse_date_text("2024-03-05T14:30:00.000Z"), expected);
        assert_eq!(parse_date_text("yesterday"), None);
    }

    // =========================================================================
    // LedgerRecord deserialization
    // =========================================================================

    #[test]
    fn deserializes_upstream_accounting_entry() {
        let json = r#"{
            "conta": "1.1.01.02",
            "descricao": "Banco",
            "nivel": 4,
            "saldo": 1500.5,
            "data": "2024-02-10",
            "valor": "250,00",
            "tipo": "credito",
            "historico": "Recebimento"
        }"#;

        let record: LedgerRecord = serde_json::from_str(json).unwrap();

        assert_eq!(
            record,
            LedgerRecord {
                account: Some("1.1.01.02".to_string()),
                description: Some("Banco".to_string()),
                level: Some("4".to_string()),
                balance: Some(dec!(1500.5)),
                date: NaiveDate::from_ymd_opt(2024, 2, 10),
                amount: Some(dec!(250.00)),
                kind: Some(RecordKind::Credit),
                memo: Some("Recebimento".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn malformed_fields_become_none() {
        let json = r#"{
            "valor": "not money",
            "data": "31/31/2024",
            "tipo": "transferencia",
            "conta": {"nested": true},
            "saldo": null
        }"#;

        let record: LedgerRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.amount, None);
        assert_eq!(record.date, None);
        assert_eq!(record.kind, Some(RecordKind::Other));
        assert_eq!(record.account, None);
        assert_eq!(record.balance, None);
    }

    #[test]
    fn empty_object_is_a_valid_record() {
        let record: LedgerRecord = serde_json::from_str("{}").unwrap();

        assert_eq!(record, LedgerRecord::default());
    }

    #[test]
    fn deserializes_book_with_upstream_keys() {
        let json = r#"{
            "type": "EFD_CONTRIBUICOES",
            "data": [{"tipo": "pis_cofins", "numero": 42}],
            "config": {
                "cnpj": "1", "razaoSocial": "X", "municipio": "Y", "uf": "RJ",
                "inicio": "2024-01-01", "fim": "2024-01-31"
            }
        }"#;

        let book: RegulatoryBook = serde_json::from_str(json).unwrap();

        assert_eq!(book.document_type, SpedKind::EfdContribuicoes);
        assert_eq!(book.records.len(), 1);
        assert_eq!(book.records[0].document_number.as_deref(), Some("42"));
    }

    #[test]
    fn non_object_records_become_empty_records() {
        let json = r#"{
            "document_type": "ECD",
            "records": [{"conta": "1"}, null, "junk", 7],
            "company": {
                "tax_id": "1", "legal_name": "X", "municipality": "Y", "state_code": "RJ",
                "period_start": "2024-01-01", "period_end": "2024-01-31"
            }
        }"#;

        let book: RegulatoryBook = serde_json::from_str(json).unwrap();

        assert_eq!(book.records.len(), 4);
        assert_eq!(book.records[0].account.as_deref(), Some("1"));
        assert!(book.records[1..].iter().all(|r| *r == LedgerRecord::default()));
    }

    #[test]
    fn unknown_document_type_is_rejected() {
        let json = r#"{
            "document_type": "NFE",
            "records": [],
            "company": {
                "tax_id": "1", "legal_name": "X", "municipality": "Y", "state_code": "RJ",
                "period_start": "2024-01-01", "period_end": "2024-01-31"
            }
        }"#;

        let err = serde_json::from_str::<RegulatoryBook>(json).unwrap_err();

        assert!(err.to_string().contains("unsupported SPED format"), "{err}");
    }

    #[test]
    fn data_kind_round_trips_through_parse() {
        for kind in DataKind::ALL {
            assert_eq!(DataKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(DataKind::parse("payroll"), None);
    }
}
