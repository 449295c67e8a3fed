pub mod calculations;
pub mod clock;
pub mod models;
pub mod source;
pub mod sped;

pub use calculations::{
    DasCalculator, DasError, DefisError, calculate_tax, defis_file_name, pgdas_file_name,
    render_defis, render_pgdas_summary,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use models::*;
pub use source::{RecordSource, SourceConfig, SourceError, SourceFactory, SourceRegistry};
pub use sped::{EncodedFile, SpedEncoder, SpedError, SpedKind, ValidationReport, encode, validate};
