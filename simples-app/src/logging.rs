//! Process-wide `tracing` setup for the `simples` binary.
//!
//! Log output goes to stderr so stdout stays reserved for command output
//! (SPED files, JSON, reports). The subscriber is installed before the
//! configuration file is read; [`apply`] then adjusts the filter, the stderr
//! gate and the optional log file in place.

use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    EnvFilter,
    Layer, // for .with_filter() on the stderr layer
    fmt::{
        FmtContext, MakeWriter,
        format::{FormatEvent, FormatFields, Writer},
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
};

use crate::config::LoggingConfig;

/// Directive used when neither `RUST_LOG` nor the configuration set one.
pub const DEFAULT_FILTER: &str = "info";

// ─── settings ────────────────────────────────────────────────────────────────

/// Logging options after merging `[logging]` with the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive; `None` keeps `RUST_LOG` or [`DEFAULT_FILTER`].
    pub filter: Option<String>,
    pub file: Option<PathBuf>,
    /// Silence stderr. The log file, if any, still receives everything.
    pub quiet: bool,
}

impl LogSettings {
    /// `--log-level` wins over `[logging] level`.
    pub fn resolve(
        config: &LoggingConfig,
        cli_level: Option<&str>,
        quiet: bool,
    ) -> Self {
        Self {
            filter: cli_level.or(config.level.as_deref()).map(str::to_string),
            file: config.file.clone(),
            quiet,
        }
    }
}

fn parse_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive).with_context(|| format!("invalid log filter '{directive}'"))
}

// ─── formatter ───────────────────────────────────────────────────────────────

/// `2025-03-14 09:05:00.123  INFO simples_core::sped: encoded SPED file kind=ECD`
struct LineFormat;

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[1;31m",
        Level::WARN => "\x1b[1;33m",
        Level::INFO => "\x1b[1;32m",
        Level::DEBUG => "\x1b[1;34m",
        Level::TRACE => "\x1b[1;35m",
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let now = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");

        if writer.has_ansi_escapes() {
            write!(
                writer,
                "\x1b[2m{now}\x1b[0m {}{:>5}\x1b[0m \x1b[36m{}:\x1b[0m ",
                level_color(*meta.level()),
                meta.level(),
                meta.target()
            )?;
        } else {
            write!(writer, "{now} {:>5} {}: ", meta.level(), meta.target())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

// ─── log file ────────────────────────────────────────────────────────────────

type SharedFile = Arc<Mutex<Option<File>>>;

/// Writer target that can be opened after the subscriber is installed.
/// Writes are dropped while no file is open.
#[derive(Clone)]
struct LogFile(SharedFile);

struct LogFileGuard<'a>(MutexGuard<'a, Option<File>>);

impl Write for LogFileGuard<'_> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        self.0.as_mut().map_or(Ok(buf.len()), |file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.as_mut().map_or(Ok(()), File::flush)
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileGuard(lock(&self.0))
    }
}

// A panic while a guard is held must not stop logging for the rest of the run.
fn lock(file: &Mutex<Option<File>>) -> MutexGuard<'_, Option<File>> {
    file.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─── runtime controls ────────────────────────────────────────────────────────

type Reload = Box<dyn Fn(EnvFilter) -> Result<(), reload::Error> + Send + Sync>;

struct Controls {
    level: Reload,
    stderr: Reload,
    file: SharedFile,
}

static CONTROLS: OnceLock<Controls> = OnceLock::new();

fn reloader<S>(handle: reload::Handle<EnvFilter, S>) -> Reload
where
    S: 'static,
{
    Box::new(move |filter| handle.reload(filter))
}

fn controls() -> Result<&'static Controls> {
    CONTROLS.get().context("logging is not initialized")
}

/// Replaces the global filter. Accepts a bare level or any `EnvFilter`
/// directive such as `info,simples_core=debug`.
pub fn set_log_level(directive: &str) -> Result<()> {
    let filter = parse_filter(directive)?;
    (controls()?.level)(filter).context("cannot reload log filter")
}

/// Turns stderr output on or off. The global filter still applies.
pub fn set_stderr_enabled(enabled: bool) -> Result<()> {
    let gate = EnvFilter::new(if enabled { "trace" } else { "off" });
    (controls()?.stderr)(gate).context("cannot reload stderr gate")
}

/// Appends log output to `path`, replacing any file opened earlier. The
/// parent directory must exist.
pub fn enable_file_logging(path: &Path) -> Result<()> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    *lock(&controls()?.file) = Some(file);
    Ok(())
}

/// Applies resolved settings to the running subscriber.
pub fn apply(settings: &LogSettings) -> Result<()> {
    if let Some(filter) = &settings.filter {
        set_log_level(filter)?;
    }
    if settings.quiet {
        set_stderr_enabled(false)?;
    }
    if let Some(path) = &settings.file {
        enable_file_logging(path)?;
    }
    Ok(())
}

/// Installs the global subscriber. Later calls are no-ops.
///
/// The filter starts from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
/// Stderr is coloured only when it is a terminal. The file layer stays
/// silent until [`enable_file_logging`] opens a file.
pub fn init() {
    let file: SharedFile = Arc::new(Mutex::new(None));

    let initial =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (level_filter, level_handle) = reload::Layer::new(initial);
    let (stderr_gate, stderr_handle) = reload::Layer::new(EnvFilter::new("trace"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .event_format(LineFormat)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_filter(stderr_gate);

    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(LogFile(file.clone()));

    let installed = tracing_subscriber::registry()
        .with(level_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        let _ = CONTROLS.set(Controls {
            level: reloader(level_handle),
            stderr: reloader(stderr_handle),
            file,
        });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn cli_level_overrides_config() {
        let config = LoggingConfig {
            level: Some("warn".to_string()),
            file: Some(PathBuf::from("simples.log")),
        };

        let settings = LogSettings::resolve(&config, Some("debug"), true);

        assert_eq!(
            settings,
            LogSettings {
                filter: Some("debug".to_string()),
                file: Some(PathBuf::from("simples.log")),
                quiet: true,
            }
        );
    }

    #[test]
    fn config_level_used_without_cli_flag() {
        let config = LoggingConfig {
            level: Some("simples_core=trace".to_string()),
            file: None,
        };

        let settings = LogSettings::resolve(&config, None, false);

        assert_eq!(settings.filter.as_deref(), Some("simples_core=trace"));
        assert!(!settings.quiet);
    }

    #[test]
    fn default_settings_change_nothing() {
        assert_eq!(
            LogSettings::resolve(&LoggingConfig::default(), None, false),
            LogSettings::default()
        );
    }

    #[test]
    fn filter_directives_are_checked() {
        assert!(parse_filter("info,simples_core=debug").is_ok());
        assert!(parse_filter("simples_core=loud").is_err());
    }
}
