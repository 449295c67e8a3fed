use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Annual socioeconomic and fiscal declaration data (DEFIS).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefisInput {
    #[serde(alias = "anoCalendario")]
    pub calendar_year: i32,

    #[serde(alias = "receitaBrutaAnual")]
    pub annual_gross_revenue: Decimal,

    /// Accounting profit; negative for a loss.
    #[serde(alias = "lucroContabil")]
    pub accounting_profit: Decimal,

    #[serde(alias = "distribuicaoLucros")]
    pub distributed_profit: Decimal,

    #[serde(alias = "empregadosEm31DeDezembro")]
    pub employees_at_year_end: u32,
}
