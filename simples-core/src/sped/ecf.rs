use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use super::BookLayout;
use super::format::{RegisterWriter, format_date, format_value};
use crate::models::{CompanyConfig, LedgerRecord, RecordKind};

/// Escrituração Contábil Fiscal, layout 0406.
pub(super) struct EcfLayout;

impl BookLayout for EcfLayout {
    fn marker(&self) -> &'static str {
        "|0010|"
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
                "0406",
                "0",
                &today,
                &today,
                &company.legal_name,
                &company.tax_id,
                "1",
                "",
            ],
        );
        out.register(
            "0010",
            &[
                &company.tax_id,
                &company.legal_name,
                &company.municipality,
                &company.state_code,
            ],
        );
        out.register(
            "0030",
            &[
                &format_date(company.period_start),
                &format_date(company.period_end),
                "1",
                "1",
                "0",
            ],
        );
    }

    fn write_record(
        &self,
        index: usize,
        record: &LedgerRecord,
        out: &mut RegisterWriter,
    ) {
        let amount = record.amount.unwrap_or(Decimal::ZERO);
        let is_expense = match record.kind {
            Some(RecordKind::Revenue) => false,
            Some(RecordKind::Expense) => true,
            _ => {
                debug!(index, %amount, "classifying ECF record by amount sign");
                amount < Decimal::ZERO
            }
        };

        let (code, default_description) = if is_expense {
            ("X291", "Despesa")
        } else {
            ("X290", "Receita")
        };
        out.register(
            code,
            &[
                &format_value(amount),
                record.description.as_deref().unwrap_or(default_description),
            ],
        );
    }
}
