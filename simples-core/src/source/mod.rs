pub mod factory;
pub mod record_source;

pub use factory::{SourceConfig, SourceFactory, SourceRegistry};
pub use record_source::{RecordSource, SourceError};
