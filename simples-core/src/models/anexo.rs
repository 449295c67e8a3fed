use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calculations::DasError;

/// Activity category ("Anexo") of the Simples Nacional regime.
///
/// Each Anexo has its own progressive rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Anexo {
    I,
    II,
    III,
    IV,
    V,
}

impl Anexo {
    pub const ALL: [Anexo; 5] = [Anexo::I, Anexo::II, Anexo::III, Anexo::IV, Anexo::V];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::I => "I",
            Self::II => "II",
            Self::III => "III",
            Self::IV => "IV",
            Self::V => "V",
        }
    }

    /// Parses a roman-numeral Anexo code. Surrounding whitespace is ignored and
    /// the match is case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "I" => Some(Self::I),
            "II" => Some(Self::II),
            "III" => Some(Self::III),
            "IV" => Some(Self::IV),
            "V" => Some(Self::V),
            _ => None,
        }
    }
}

impl FromStr for Anexo {
    type Err = DasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| DasError::UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for Anexo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
