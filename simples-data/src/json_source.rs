use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use simples_core::{
    DataKind, LedgerRecord, RecordSource, SourceConfig, SourceError, SourceFactory,
    lenient_records,
};
use tracing::{debug, info};

/// Record source backed by a directory of ERP JSON exports, one file per
/// record family (`sales.json`, `purchases.json`, ...).
///
/// Each file holds either a bare array of records or an ERP response
/// envelope `{"data": [...]}`.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    root: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonPayload {
    Records(#[serde(deserialize_with = "lenient_records")] Vec<LedgerRecord>),
    Envelope {
        #[serde(deserialize_with = "lenient_records")]
        data: Vec<LedgerRecord>,
    },
}

impl JsonDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(
        &self,
        kind: DataKind,
    ) -> PathBuf {
        self.root.join(format!("{}.json", kind.as_str()))
    }
}

#[async_trait]
impl RecordSource for JsonDirectorySource {
    fn provider(&self) -> &str {
        JsonSourceFactory::PROVIDER
    }

    async fn test_connection(&self) -> Result<(), SourceError> {
        let metadata = tokio::fs::metadata(&self.root).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                SourceError::NotFound(format!("directory {}", self.root.display()))
            }
            _ => SourceError::Io(e.to_string()),
        })?;

        if !metadata.is_dir() {
            return Err(SourceError::Configuration(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }

    async fn fetch_records(
        &self,
        kind: DataKind,
    ) -> Result<Vec<LedgerRecord>, SourceError> {
        let path = self.path_for(kind);
        debug!(path = %path.display(), "reading records");

        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => SourceError::NotFound(format!("{kind} at {}", path.display())),
            _ => SourceError::Io(format!("{}: {e}", path.display())),
        })?;

        let records = match serde_json::from_str::<JsonPayload>(&contents)
            .map_err(|e| SourceError::Parse(format!("{}: {e}", path.display())))?
        {
            JsonPayload::Records(records) => records,
            JsonPayload::Envelope { data } => data,
        };

        info!(%kind, count = records.len(), "fetched records");
        Ok(records)
    }
}

/// Factory for [`JsonDirectorySource`]; the connection string is the
/// directory path.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSourceFactory;

impl JsonSourceFactory {
    pub const PROVIDER: &'static str = "json";
}

#[async_trait]
impl SourceFactory for JsonSourceFactory {
    fn provider_name(&self) -> &'static str {
        Self::PROVIDER
    }

    async fn create(
        &self,
        config: &SourceConfig,
    ) -> Result<Box<dyn RecordSource>, SourceError> {
        if config.connection_string.trim().is_empty() {
            return Err(SourceError::Configuration(
                "json provider needs a directory path".to_string(),
            ));
        }
        Ok(Box::new(JsonDirectorySource::new(&config.connection_string)))
    }
}
