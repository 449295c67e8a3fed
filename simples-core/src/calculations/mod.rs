pub mod common;
pub mod das;
pub mod defis;
pub mod pgdas;

pub use das::{DasCalculator, DasError, calculate_tax};
pub use defis::{DefisError, defis_file_name, render_defis};
pub use pgdas::{pgdas_file_name, render_pgdas_summary};
