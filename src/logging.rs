use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

pub const LEVEL_ENV: &str = "QUIZBREAK_LOG";
const DEFAULT_DIRECTIVES: &str = "info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unable to create log directory: {0}")]
    Io(#[from] io::Error),
    #[error("unable to open log file: {0}")]
    Appender(#[from] InitError),
    #[error("unable to install the subscriber: {0}")]
    Install(Box<dyn std::error::Error + Send + Sync>),
}

/// Directives in `EnvFilter` syntax, e.g. `warn,quizbreak::session=debug`.
/// Anything unparsable falls back to `info`.
pub fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

pub fn filter_from_env() -> EnvFilter {
    filter_from(std::env::var(LEVEL_ENV).ok().as_deref())
}

/// Single never-rotated file at `path`; the terminal belongs to the UI
pub fn file_appender(path: &Path) -> Result<RollingFileAppender, LoggingError> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("quizbreak.log");
    fs::create_dir_all(dir)?;

    Ok(RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)?)
}

/// Installs the global subscriber writing to `path`
pub fn init(path: &Path, filter: EnvFilter) -> Result<(), LoggingError> {
    let appender = file_appender(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(appender)
        .with_ansi(false)
        .try_init()
        .map_err(LoggingError::Install)
}
