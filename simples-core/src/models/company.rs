use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::sped::SpedError;

/// Company identification written into the opening registers of a SPED file.
///
/// Only presence is checked; CNPJ and state registration formats are left to
/// the receiving system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyConfig {
    /// CNPJ, written exactly as given.
    #[serde(alias = "cnpj")]
    pub tax_id: String,

    /// Razão social.
    #[serde(alias = "razaoSocial")]
    pub legal_name: String,

    /// Inscrição estadual, written as an empty field when absent.
    #[serde(default, alias = "inscricaoEstadual")]
    pub state_registration: Option<String>,

    #[serde(alias = "municipio")]
    pub municipality: String,

    /// Two-letter UF code.
    #[serde(alias = "uf")]
    pub state_code: String,

    /// First day of the bookkeeping period.
    #[serde(alias = "inicio")]
    pub period_start: NaiveDate,

    /// Last day of the bookkeeping period.
    #[serde(alias = "fim")]
    pub period_end: NaiveDate,
}

impl CompanyConfig {
    /// Checks that every required text field is present and the period is
    /// not inverted.
    pub fn validate(&self) -> Result<(), SpedError> {
        let required = [
            ("tax_id", &self.tax_id),
            ("legal_name", &self.legal_name),
            ("municipality", &self.municipality),
            ("state_code", &self.state_code),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(SpedError::MissingCompanyField(name));
            }
        }

        if self.period_start > self.period_end {
            return Err(SpedError::InvalidPeriod {
                start: self.period_start,
                end: self.period_end,
            });
        }

        Ok(())
    }

    /// State registration or the empty string.
    pub fn state_registration_or_empty(&self) -> &str {
        self.state_registration.as_deref().unwrap_or("")
    }
}
