pub mod book;
pub mod csv_loader;
pub mod export;
pub mod json_source;
pub mod loader;

pub use book::{BookError, load_book, parse_book};
pub use csv_loader::CsvLoadError;
pub use export::{ExportError, ExportFormat, export_file_name, export_records};
pub use json_source::{JsonDirectorySource, JsonSourceFactory};
pub use loader::{BracketLoader, BracketLoaderError, BracketRecord};
