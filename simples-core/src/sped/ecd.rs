use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::BookLayout;
use super::format::{RegisterWriter, format_date, format_value};
use crate::models::{CompanyConfig, LedgerRecord, RecordKind};

const DEFAULT_ACCOUNT: &str = "1.1.01.01";
const DEFAULT_DESCRIPTION: &str = "Conta Genérica";
const DEFAULT_LEVEL: &str = "4";
const DEFAULT_MEMO: &str = "Lançamento contábil";

/// Escrituração Contábil Digital, layout 014.
pub(super) struct EcdLayout;

impl BookLayout for EcdLayout {
    fn marker(&self) -> &'static str {
        "|0001|0|"
    }

    fn write_opening(
        &self,
        company: &CompanyConfig,
        today: NaiveDate,
        out: &mut RegisterWriter,
    ) {
        let today = format_date(today);
        out.register(
            "0000",
            &[
                "014",
                "0",
                &today,
                &today,
                &company.legal_name,
                &company.tax_id,
                &company.state_code,
                company.state_registration_or_empty(),
                &company.municipality,
                "G",
                "",
            ],
        );
        out.register("0001", &["0"]);
        out.register(
            "0007",
            &[
                &company.tax_id,
                company.state_registration_or_empty(),
                &company.legal_name,
                &company.municipality,
                &company.state_code,
            ],
        );
        out.register(
            "0020",
            &[
                &format_date(company.period_start),
                &format_date(company.period_end),
                "3",
                "1",
                "N",
                "1,00",
                "",
            ],
        );
    }

    fn write_record(
        &self,
        index: usize,
        record: &LedgerRecord,
        out: &mut RegisterWriter,
    ) {
        let account = record.account.as_deref().unwrap_or(DEFAULT_ACCOUNT);

        // I050: chart of accounts
        out.register(
            "I050",
            &[
                account,
                record.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION),
                record.level.as_deref().unwrap_or(DEFAULT_LEVEL),
            ],
        );

        // I150: balance
        let balance = format_value(record.balance.unwrap_or(Decimal::ZERO));
        out.register("I150", &[account, &balance, "D"]);

        // I155: journal entry, only for dated non-zero amounts
        if let (Some(date), Some(amount)) = (record.date, record.amount) {
            if !amount.is_zero() {
                let nature = if record.kind == Some(RecordKind::Credit) {
                    "C"
                } else {
                    "D"
                };
                out.register(
                    "I155",
                    &[
                        &format_date(date),
                        &index.to_string(),
                        account,
                        &format_value(amount),
                        nature,
                        record.memo.as_deref().unwrap_or(DEFAULT_MEMO),
                    ],
                );
            }
        }
    }
}
