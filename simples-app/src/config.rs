//! `simples.toml`, the optional configuration file.
//!
//! ```toml
//! brackets_file = "tabelas/2025.csv"
//!
//! [company]
//! tax_id = "12345678000190"
//! legal_name = "Padaria Exemplo LTDA"
//! municipality = "Campinas"
//! state_code = "SP"
//! period_start = "2024-01-01"
//! period_end = "2024-12-31"
//!
//! [logging]
//! level = "debug"
//! file = "simples.log"
//!
//! [source]
//! provider = "json"
//! connection_string = "./erp"
//! ```
use std::path::{Path, PathBuf};

use serde::Deserialize;
use simples_core::{BracketSchedule, CompanyConfig, SourceConfig};
use simples_data::{BracketLoader, BracketLoaderError};
use thiserror::Error;
use tracing::{debug, info};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "simples.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Brackets(#[from] BracketLoaderError),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Replacement rate tables; Anexos missing from the file keep their
    /// built-in table.
    pub brackets_file: Option<PathBuf>,

    /// Company issuing the files; when set it replaces the company carried
    /// by each book.
    pub company: Option<CompanyConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

impl AppConfig {
    /// Parses configuration text. `path` is only used in error messages.
    pub fn from_toml(
        text: &str,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Built-in tables, overridden per Anexo by `brackets_file` when set.
    pub fn bracket_schedule(&self) -> Result<BracketSchedule, ConfigError> {
        let mut schedule = BracketSchedule::simples_nacional();
        if let Some(path) = &self.brackets_file {
            let overrides = BracketLoader::load_from_file(path)?;
            for anexo in overrides.anexos() {
                if let Some(table) = overrides.table(anexo) {
                    schedule.insert(table.clone());
                }
            }
            info!(path = %path.display(), "using custom bracket tables");
        }
        Ok(schedule)
    }
}

/// Loads `path`. A missing file yields the default configuration.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            debug!(path = %path.display(), "loading configuration");
            AppConfig::from_toml(&text, path)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(AppConfig::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
