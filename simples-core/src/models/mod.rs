mod anexo;
mod bracket;
mod company;
mod defis;
mod ledger;
mod tax_calculation;

pub use anexo::Anexo;
pub use bracket::{BracketSchedule, BracketTable, BracketTableError, TaxBracket};
pub use company::CompanyConfig;
pub use defis::DefisInput;
pub use ledger::{
    DataKind, LedgerRecord, RecordKind, RegulatoryBook, lenient_records, parse_date_text,
    parse_decimal_text,
};
pub use tax_calculation::{TaxCalculationInput, TaxCalculationResult};
