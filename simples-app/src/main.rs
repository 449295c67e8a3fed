use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use simples_app::config::{AppConfig, DEFAULT_CONFIG_FILE, load_config};
use simples_app::logging::LogSettings;
use simples_app::utils::{parse_decimal, parse_revenue};
use simples_app::{app, logging};
use simples_core::{
    Anexo, Clock, DataKind, DefisInput, SpedKind, SystemClock, TaxCalculationInput, defis_file_name,
    pgdas_file_name,
};
use simples_data::{ExportFormat, csv_loader, export_file_name, load_book};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Simples Nacional toolkit: DAS calculation, DEFIS, and SPED files.
#[derive(Debug, Parser)]
#[command(name = "simples", version, about)]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log filter, e.g. `debug` or `simples_core=trace`. Overrides the
    /// configuration file and RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Suppress log output on stderr.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Calculate the DAS for one competência.
    Das {
        /// Competência, `YYYY-MM`.
        #[arg(long)]
        period: String,

        /// Anexo, `I` to `V`.
        #[arg(long)]
        anexo: Anexo,

        /// Gross revenue of the month (`30000.00` or `30.000,00`).
        #[arg(long, value_parser = parse_revenue)]
        month_revenue: Decimal,

        /// Gross revenue of the trailing twelve months.
        #[arg(long, value_parser = parse_revenue)]
        rbt12: Decimal,

        /// Print JSON instead of the summary.
        #[arg(long)]
        json: bool,

        /// Also write the PGDAS-D summary to this file, or into this
        /// directory as `PGDAS_YYYYMM.txt`.
        #[arg(long)]
        summary_out: Option<PathBuf>,
    },

    /// Calculate every row of a CSV (`period_id,anexo,month_revenue,rbt12`).
    DasBatch {
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Render the DEFIS declaration.
    Defis {
        #[arg(long)]
        year: i32,

        #[arg(long, value_parser = parse_revenue)]
        revenue: Decimal,

        /// Accounting profit; negative for a loss.
        #[arg(long, allow_hyphen_values = true, value_parser = parse_signed)]
        profit: Decimal,

        #[arg(long, value_parser = parse_revenue)]
        distributed: Decimal,

        #[arg(long)]
        employees: u32,

        /// Output file, or a directory to receive `DEFIS_{year}.txt`.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// SPED file generation and checking.
    Sped {
        #[command(subcommand)]
        command: SpedCommand,
    },

    /// Export the records of a book as csv, tsv or text.
    Export {
        #[arg(long)]
        book: PathBuf,

        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Report title; defaults to the book type and company name.
        #[arg(long)]
        title: Option<String>,

        /// Output file, or a directory to receive `{title}.{ext}`.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Fetch records from the configured ERP source and print them as JSON.
    Fetch {
        #[arg(long, value_parser = parse_data_kind)]
        kind: DataKind,

        /// Overrides `[source] provider`.
        #[arg(long)]
        provider: Option<String>,

        /// Overrides `[source] connection_string`.
        #[arg(long)]
        connection: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum SpedCommand {
    /// Encode a book document (JSON) into a SPED text file.
    Encode {
        #[arg(long)]
        book: PathBuf,

        /// Output file, or a directory to receive `SPED_{kind}_{date}.txt`.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Check the structure of a SPED text file.
    Validate {
        #[arg(long)]
        file: PathBuf,

        /// ECD, ECF or EFD_CONTRIBUICOES.
        #[arg(long)]
        kind: SpedKind,
    },
}

fn parse_signed(s: &str) -> Result<Decimal, String> {
    parse_decimal(s).map_err(|e| e.to_string())
}

fn parse_data_kind(s: &str) -> Result<DataKind, String> {
    DataKind::parse(s).ok_or_else(|| {
        let names: Vec<_> = DataKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown record family '{s}', expected one of {}", names.join(", "))
    })
}

// ─── helpers ─────────────────────────────────────────────────────────────────

/// `out` itself, or `out/name` when `out` is an existing directory.
fn resolve_output(
    out: Option<&Path>,
    name: impl FnOnce() -> String,
) -> Option<PathBuf> {
    out.map(|path| {
        if path.is_dir() {
            path.join(name())
        } else {
            path.to_path_buf()
        }
    })
}

// ─── commands ────────────────────────────────────────────────────────────────

async fn run(
    command: Command,
    config: &AppConfig,
) -> Result<()> {
    match command {
        Command::Das {
            period,
            anexo,
            month_revenue,
            rbt12,
            json,
            summary_out,
        } => {
            let schedule = config.bracket_schedule()?;
            let input = TaxCalculationInput {
                period_id: period,
                category: anexo,
                month_revenue,
                trailing_twelve_month_revenue: rbt12,
            };
            let outcome = app::calculate(&schedule, input)?;

            let mut text = app::render_outcome(&outcome, json)?;
            text.push('\n');
            app::write_output(None, &text)?;

            let target = resolve_output(summary_out.as_deref(), || {
                pgdas_file_name(&outcome.input.period_id)
            });
            if let Some(path) = target {
                let summary = app::render_outcome(&outcome, false)?;
                app::write_output(Some(&path), &summary)?;
            }
        }

        Command::DasBatch { file, json } => {
            let schedule = config.bracket_schedule()?;
            let inputs = csv_loader::load_from_file(&file)
                .with_context(|| format!("cannot load {}", file.display()))?;
            info!(rows = inputs.len(), "loaded DAS inputs");

            let outcomes = app::calculate_batch(&schedule, inputs)?;
            let mut text = app::render_batch(&outcomes, json)?;
            if json {
                text.push('\n');
            }
            app::write_output(None, &text)?;
        }

        Command::Defis {
            year,
            revenue,
            profit,
            distributed,
            employees,
            out,
        } => {
            let input = DefisInput {
                calendar_year: year,
                annual_gross_revenue: revenue,
                accounting_profit: profit,
                distributed_profit: distributed,
                employees_at_year_end: employees,
            };
            let mut text = app::defis_text(&input)?;
            text.push('\n');
            let target = resolve_output(out.as_deref(), || defis_file_name(year));
            app::write_output(target.as_deref(), &text)?;
        }

        Command::Sped {
            command: SpedCommand::Encode { book, out },
        } => {
            let mut book =
                load_book(&book).with_context(|| format!("cannot load {}", book.display()))?;
            app::apply_company(&mut book, config.company.as_ref());
            let clock = SystemClock;
            let file = app::encode_book(&book, &clock)?;
            let today = clock.today();
            let target = resolve_output(out.as_deref(), || file.file_name(today));
            app::write_output(target.as_deref(), &file.to_text())?;
        }

        Command::Sped {
            command: SpedCommand::Validate { file, kind },
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let report = app::validate_text(&text, kind);
            if !report.valid {
                for error in &report.errors {
                    println!("{error}");
                }
                anyhow::bail!("{} is not a valid {kind} file", file.display());
            }
            println!("{} is a valid {kind} file", file.display());
        }

        Command::Export {
            book,
            format,
            title,
            out,
        } => {
            let mut book =
                load_book(&book).with_context(|| format!("cannot load {}", book.display()))?;
            app::apply_company(&mut book, config.company.as_ref());
            let title = title.unwrap_or_else(|| {
                format!("{} - {}", book.document_type, book.company.legal_name)
            });
            let text = app::export_book(&book, format, &title, Local::now().naive_local())?;
            let target = resolve_output(out.as_deref(), || export_file_name(&title, format));
            app::write_output(target.as_deref(), &text)?;
        }

        Command::Fetch {
            kind,
            provider,
            connection,
        } => {
            let mut source = config.source.clone();
            if let Some(provider) = provider {
                source.provider = provider;
            }
            if let Some(connection) = connection {
                source.connection_string = connection;
            }

            let registry = app::build_registry();
            debug!(available = ?registry.available_providers(), "registry ready");
            let records = app::fetch_records(&registry, &source, kind).await?;
            if records.is_empty() {
                warn!(%kind, "source returned no records");
            }
            let mut text = serde_json::to_string_pretty(&records)?;
            text.push('\n');
            app::write_output(None, &text)?;
        }
    }
    Ok(())
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("cannot load {}", cli.config.display()))?;
    logging::apply(&LogSettings::resolve(
        &config.logging,
        cli.log_level.as_deref(),
        cli.quiet,
    ))?;

    run(cli.command, &config).await
}
