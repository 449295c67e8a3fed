use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::BookLayout;
use super::format::{RegisterWriter, format_date, format_value};
use crate::models::{CompanyConfig, LedgerRecord};

/// EFD-Contribuições (PIS/COFINS), layout 018.
pub(super) struct EfdLayout;

impl BookLayout for EfdLayout {
    fn marker(&self) -> &'static str {
        "|0110|"
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
                "018",
                "1",
                &today,
                &today,
                &company.legal_name,
                &company.tax_id,
                &company.state_code,
                company.state_registration_or_empty(),
                "A",
                "",
            ],
        );
        out.register("0001", &["0"]);
        out.register(
            "0010",
            &[
                &company.tax_id,
                &company.legal_name,
                &company.municipality,
                &company.state_code,
                "",
            ],
        );
        out.register(
            "0110",
            &[
                "1",
                &format_date(company.period_start),
                &format_date(company.period_end),
            ],
        );
    }

    fn write_record(
        &self,
        _index: usize,
        record: &LedgerRecord,
        out: &mut RegisterWriter,
    ) {
        let date = record.date.map(format_date).unwrap_or_default();
        let value = |v: Option<Decimal>| format_value(v.unwrap_or(Decimal::ZERO));

        // A100: service document
        out.register(
            "A100",
            &[
                "0",
                "1",
                &date,
                record.document_number.as_deref().unwrap_or("1"),
                "",
                "",
                "",
                "",
                &value(record.tax_base),
                &value(record.pis_amount),
                &value(record.cofins_amount),
            ],
        );
    }
}
