//! Set-up of the `fern` logger shared by every subcommand.
//!
//! On the console, warnings and errors go to stderr and all other messages to stdout. Levels are
//! coloured when the stream is a terminal. A design run also keeps two plain-text log files in
//! its output folder, one of them holding only warnings and errors.
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Metadata, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::OnceLock;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Log level used when neither `settings.toml` nor the environment choose one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable whose log level wins over the one in `settings.toml`
pub const LOG_LEVEL_ENV_VAR: &str = "HUBDESIGN_LOG_LEVEL";

const INFO_LOG_FILE_NAME: &str = "hubdesign_info.log";
const ERROR_LOG_FILE_NAME: &str = "hubdesign_error.log";

/// Whether [`init`] has already installed the logger
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Parse a level name (`off`, `error`, `warn`, `info`, `debug` or `trace`) in any case
fn parse_log_level(name: &str) -> Result<LevelFilter> {
    name.parse().map_err(|_| anyhow!("Unknown log level: {name}"))
}

/// Pick the log level of a run from the environment, then the settings, then the default
fn choose_log_level(from_env: Option<&str>, from_settings: Option<&str>) -> Result<LevelFilter> {
    parse_log_level(from_env.or(from_settings).unwrap_or(DEFAULT_LOG_LEVEL))
}

/// Install the program logger.
///
/// # Arguments
///
/// * `log_level_from_settings` - The `log_level` of `settings.toml`, overridden by
///   `HUBDESIGN_LOG_LEVEL` when that is set
/// * `log_dir` - Folder for the log files of a run; no files are written if `None`
pub fn init(log_level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    let from_env = env::var(LOG_LEVEL_ENV_VAR).ok();
    let level = choose_log_level(from_env.as_deref(), log_level_from_settings)?;
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let mut dispatch = Dispatch::new()
        .chain(
            console(level, io::stdout().is_terminal(), colours)
                .filter(below_warnings)
                .chain(io::stdout()),
        )
        .chain(
            console(level.min(LevelFilter::Warn), io::stderr().is_terminal(), colours)
                .chain(io::stderr()),
        );

    if let Some(log_dir) = log_dir {
        // The info file always records the progress of a run, even for a quieter console
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(below_warnings)
                    .format(write_plain)
                    .level(level.max(LevelFilter::Info))
                    .chain(create_log_file(log_dir, INFO_LOG_FILE_NAME)?),
            )
            .chain(
                Dispatch::new()
                    .format(write_plain)
                    .level(LevelFilter::Warn)
                    .chain(create_log_file(log_dir, ERROR_LOG_FILE_NAME)?),
            );
    }

    // Fails if another logger is installed
    dispatch.apply()?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

fn below_warnings(metadata: &Metadata) -> bool {
    metadata.level() > LevelFilter::Warn
}

fn create_log_file(log_dir: &Path, file_name: &str) -> Result<File> {
    let file_path = log_dir.join(file_name);
    File::create(&file_path)
        .with_context(|| format!("Could not create log file {}", file_path.display()))
}

/// A console output whose level names are coloured if `use_colour` is set
fn console(level: LevelFilter, use_colour: bool, colours: ColoredLevelConfig) -> Dispatch {
    Dispatch::new()
        .level(level)
        .format(move |out, message, record| {
            if use_colour {
                write_entry(out, colours.color(record.level()), record.target(), message);
            } else {
                write_plain(out, message, record);
            }
        })
}

fn write_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_entry(out, record.level(), record.target(), message);
}

/// Format one entry as `[time level module] message`
fn write_entry<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let time = Local::now().format("%H:%M:%S");
    out.finish(format_args!("[{time} {level} {target}] {message}"));
}
