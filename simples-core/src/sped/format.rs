//! Field formatting shared by every SPED book.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::calculations::common::round_half_up;

/// Code of the closing register.
pub const CLOSING_REGISTER: &str = "9999";

/// Two decimals with a comma separator: `1311,00`, `-5,00`.
pub fn format_value(value: Decimal) -> String {
    format!("{:.2}", round_half_up(value)).replace('.', ",")
}

/// `YYYYMMDD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Accumulates register lines of the form `|CODE|field1|...|fieldN|`.
#[derive(Debug, Default)]
pub struct RegisterWriter {
    lines: Vec<String>,
}

impl RegisterWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one register. Line breaks and `|` inside a field become
    /// spaces, so each register stays one physical line with its column
    /// count intact.
    pub fn register(
        &mut self,
        code: &str,
        fields: &[&str],
    ) {
        let mut line = String::from("|");
        line.push_str(code);
        line.push('|');
        for field in fields {
            line.extend(field.chars().map(|c| match c {
                '\r' | '\n' | '|' => ' ',
                other => other,
            }));
            line.push('|');
        }
        self.lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Appends the `9999` register, whose count includes itself, and returns
    /// the finished lines.
    pub fn close(mut self) -> Vec<String> {
        let total = (self.lines.len() + 1).to_string();
        self.register(CLOSING_REGISTER, &[&total]);
        self.lines
    }
}
