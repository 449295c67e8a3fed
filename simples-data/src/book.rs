use std::path::Path;

use simples_core::RegulatoryBook;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BookError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid book document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a book document (`document_type`, `records`, `company`).
pub fn parse_book(json: &str) -> Result<RegulatoryBook, BookError> {
    let book: RegulatoryBook = serde_json::from_str(json)?;
    debug!(
        kind = %book.document_type,
        records = book.records.len(),
        "parsed book"
    );
    Ok(book)
}

pub fn load_book(path: &Path) -> Result<RegulatoryBook, BookError> {
    let contents = std::fs::read_to_string(path)?;
    parse_book(&contents)
}
