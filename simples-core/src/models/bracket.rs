use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Anexo;

/// One row of a progressive rate table.
///
/// Revenue up to and including `upper_bound` falls into this bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub upper_bound: Decimal,
    /// Nominal rate in percent (e.g. `7.3` for 7.3%).
    pub nominal_rate: Decimal,
    /// Amount subtracted from the nominal tax ("parcela a deduzir").
    pub deduction: Decimal,
}

impl TaxBracket {
    pub fn new(
        upper_bound: Decimal,
        nominal_rate: Decimal,
        deduction: Decimal,
    ) -> Self {
        Self {
            upper_bound,
            nominal_rate,
            deduction,
        }
    }
}

/// Errors raised while assembling a bracket table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BracketTableError {
    #[error("bracket table for Anexo {0} is empty")]
    Empty(Anexo),

    #[error("bracket table for Anexo {anexo} is not sorted: {upper_bound} follows {previous}")]
    Unsorted {
        anexo: Anexo,
        previous: Decimal,
        upper_bound: Decimal,
    },

    #[error(
        "bracket table for Anexo {anexo} has a negative value in bracket ending at {upper_bound}"
    )]
    NegativeValue { anexo: Anexo, upper_bound: Decimal },
}

/// Ascending sequence of brackets for a single Anexo.
///
/// The last bracket is open-ended: revenue above every bound is taxed with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTable {
    anexo: Anexo,
    brackets: Vec<TaxBracket>,
}

impl BracketTable {
    /// Builds a table, rejecting empty, unsorted or negative tables.
    pub fn new(
        anexo: Anexo,
        brackets: Vec<TaxBracket>,
    ) -> Result<Self, BracketTableError> {
        if brackets.is_empty() {
            return Err(BracketTableError::Empty(anexo));
        }

        for bracket in &brackets {
            if bracket.upper_bound.is_sign_negative()
                || bracket.nominal_rate.is_sign_negative()
                || bracket.deduction.is_sign_negative()
            {
                return Err(BracketTableError::NegativeValue {
                    anexo,
                    upper_bound: bracket.upper_bound,
                });
            }
        }

        for pair in brackets.windows(2) {
            if pair[1].upper_bound <= pair[0].upper_bound {
                return Err(BracketTableError::Unsorted {
                    anexo,
                    previous: pair[0].upper_bound,
                    upper_bound: pair[1].upper_bound,
                });
            }
        }

        Ok(Self { anexo, brackets })
    }

    pub fn anexo(&self) -> Anexo {
        self.anexo
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Returns the bracket that applies to `revenue`: the first whose upper
    /// bound is at least `revenue`, or the last one when revenue exceeds
    /// every bound.
    pub fn find(
        &self,
        revenue: Decimal,
    ) -> &TaxBracket {
        self.brackets
            .iter()
            .find(|b| revenue <= b.upper_bound)
            .unwrap_or_else(|| &self.brackets[self.brackets.len() - 1])
    }

    /// Zero-based position of the bracket returned by [`BracketTable::find`].
    pub fn position(
        &self,
        revenue: Decimal,
    ) -> usize {
        self.brackets
            .iter()
            .position(|b| revenue <= b.upper_bound)
            .unwrap_or(self.brackets.len() - 1)
    }
}

/// The full set of rate tables, keyed by Anexo.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BracketSchedule {
    tables: BTreeMap<Anexo, BracketTable>,
}

impl BracketSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five built-in Simples Nacional tables.
    pub fn simples_nacional() -> Self {
        let mut schedule = Self::new();
        for (anexo, rows) in builtin_rows() {
            let brackets = rows
                .iter()
                .map(|&(upper_bound, rate, deduction)| {
                    TaxBracket::new(upper_bound, rate, deduction)
                })
                .collect();
            // The built-in rows are sorted and non-negative.
            if let Ok(table) = BracketTable::new(anexo, brackets) {
                schedule.insert(table);
            }
        }
        schedule
    }

    /// Adds a table, replacing any table already present for the same Anexo.
    pub fn insert(
        &mut self,
        table: BracketTable,
    ) {
        self.tables.insert(table.anexo(), table);
    }

    pub fn table(
        &self,
        anexo: Anexo,
    ) -> Option<&BracketTable> {
        self.tables.get(&anexo)
    }

    pub fn anexos(&self) -> Vec<Anexo> {
        self.tables.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

type BracketRow = (Decimal, Decimal, Decimal);

fn builtin_rows() -> [(Anexo, [BracketRow; 6]); 5] {
    [
        (
            Anexo::I,
            [
                (dec!(180000), dec!(4.0), dec!(0)),
                (dec!(360000), dec!(7.3), dec!(5940)),
                (dec!(720000), dec!(9.5), dec!(13860)),
                (dec!(1800000), dec!(10.7), dec!(22500)),
                (dec!(3600000), dec!(14.3), dec!(87300)),
                (dec!(4800000), dec!(19.0), dec!(378000)),
            ],
        ),
        (
            Anexo::II,
            [
                (dec!(180000), dec!(4.5), dec!(0)),
                (dec!(360000), dec!(7.8), dec!(5940)),
                (dec!(720000), dec!(10.0), dec!(13860)),
                (dec!(1800000), dec!(11.2), dec!(22500)),
                (dec!(3600000), dec!(14.7), dec!(85500)),
                (dec!(4800000), dec!(30.0), dec!(720000)),
            ],
        ),
        (
            Anexo::III,
            [
                (dec!(180000), dec!(6.0), dec!(0)),
                (dec!(360000), dec!(11.2), dec!(9360)),
                (dec!(720000), dec!(13.5), dec!(17640)),
                (dec!(1800000), dec!(16.0), dec!(35640)),
                (dec!(3600000), dec!(21.0), dec!(125640)),
                (dec!(4800000), dec!(33.0), dec!(648000)),
            ],
        ),
        (
            Anexo::IV,
            [
                (dec!(180000), dec!(4.5), dec!(0)),
                (dec!(360000), dec!(9.0), dec!(8100)),
                (dec!(720000), dec!(10.2), dec!(12420)),
                (dec!(1800000), dec!(14.0), dec!(39780)),
                (dec!(3600000), dec!(22.0), dec!(183780)),
                (dec!(4800000), dec!(33.0), dec!(828000)),
            ],
        ),
        (
            Anexo::V,
            [
                (dec!(180000), dec!(15.5), dec!(0)),
                (dec!(360000), dec!(18.0), dec!(4500)),
                (dec!(720000), dec!(19.5), dec!(9900)),
                (dec!(1800000), dec!(20.5), dec!(17100)),
                (dec!(3600000), dec!(23.0), dec!(62100)),
                (dec!(4800000), dec!(30.5), dec!(540000)),
            ],
        ),
    ]
}
