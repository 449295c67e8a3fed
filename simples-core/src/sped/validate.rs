use serde::{Deserialize, Serialize};

use super::SpedKind;

/// Outcome of a structural check. `valid` is true iff `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn ok() -> Self {
        Self::from_errors(Vec::new())
    }

    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Checks the structure of a SPED file: opening register first, closing
/// register last, and the book's identifying register somewhere in between.
///
/// The text is expected to end with a newline, so the closing register is
/// the second-to-last `\n`-separated segment. Field contents are not checked.
pub fn validate(
    text: &str,
    kind: SpedKind,
) -> ValidationReport {
    let mut errors = Vec::new();

    let first = text.split('\n').find(|line| !line.trim().is_empty());
    if !first.is_some_and(|line| line.starts_with("|0000|")) {
        errors.push("file must start with register 0000".to_string());
    }

    let segments: Vec<&str> = text.split('\n').collect();
    let closing = segments.len().checked_sub(2).map(|i| segments[i]);
    if !closing.is_some_and(|line| line.starts_with("|9999|")) {
        errors.push("file must end with register 9999".to_string());
    }

    if !text.contains(kind.marker()) {
        errors.push(format!(
            "{kind} file must contain register {}",
            kind.marker().trim_matches('|').replace('|', " ")
        ));
    }

    ValidationReport::from_errors(errors)
}
