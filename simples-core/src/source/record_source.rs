use async_trait::async_trait;
use thiserror::Error;

use crate::models::{DataKind, LedgerRecord};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("No records available: {0}")]
    NotFound(String),

    #[error("Malformed records: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Read side of an ERP integration.
///
/// Connection state (connected, syncing, last sync) belongs to the caller;
/// a source only answers requests.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Provider identifier, matching the factory that built this source.
    fn provider(&self) -> &str;

    /// Cheap reachability check.
    async fn test_connection(&self) -> Result<(), SourceError>;

    /// Records of one family, in the order the provider returns them.
    async fn fetch_records(&self, kind: DataKind) -> Result<Vec<LedgerRecord>, SourceError>;
}
