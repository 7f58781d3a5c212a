//! Logging infrastructure for hashward.
//!
//! Records go through the `log` facade to an `env_logger` backend. Each line
//! carries a local timestamp and a level; when a log file is configured the
//! same line is also appended to it.

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Logging configuration.
pub struct LogConfig {
    /// Log level
    pub level: LevelFilter,
    /// Append-only log file
    pub file_path: Option<PathBuf>,
    /// Show module path
    pub module_path: bool,
    /// Colour the level tag (console-only sinks)
    pub color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            module_path: false,
            color: true,
        }
    }
}

impl LogConfig {
    /// Create a log config from application config.
    pub fn from_config(config: &Config) -> Self {
        let level = parse_level(&config.logging.log_level);

        Self {
            level,
            file_path: config.logging.log_file.clone(),
            module_path: level >= LevelFilter::Debug,
            color: config.logging.log_file.is_none(),
        }
    }

    /// Raise verbosity to debug with module paths.
    pub fn verbose(mut self) -> Self {
        self.level = LevelFilter::Debug;
        self.module_path = true;
        self
    }
}

fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Render one log line.
fn format_line(record: &log::Record<'_>, module_path: bool, color: bool) -> String {
    let mut output = format!("{} ", Local::now().format("%Y-%m-%d %H:%M:%S"));

    let level = record.level();
    let level_str = if color {
        match level {
            log::Level::Error => "\x1b[31mERROR\x1b[0m",
            log::Level::Warn => "\x1b[33mWARN\x1b[0m ",
            log::Level::Info => "\x1b[32mINFO\x1b[0m ",
            log::Level::Debug => "\x1b[34mDEBUG\x1b[0m",
            log::Level::Trace => "\x1b[35mTRACE\x1b[0m",
        }
    } else {
        match level {
            log::Level::Error => "ERROR",
            log::Level::Warn => "WARN ",
            log::Level::Info => "INFO ",
            log::Level::Debug => "DEBUG",
            log::Level::Trace => "TRACE",
        }
    };
    output.push_str(&format!("[{}] ", level_str));

    if module_path {
        if let Some(path) = record.module_path() {
            output.push_str(&format!("{}: ", path));
        }
    }

    output.push_str(&record.args().to_string());
    output
}

/// Initialize the logging system.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let mut builder = Builder::new();
    builder.filter_level(config.level);

    let module_path = config.module_path;
    let color = config.color;
    builder.format(move |buf, record| writeln!(buf, "{}", format_line(record, module_path, color)));

    let (target, file_error) = log_target(config.file_path.as_deref());
    builder.target(target);

    builder
        .try_init()
        .map_err(|e| Error::Internal(format!("Logger already initialized: {}", e)))?;

    if let Some(e) = file_error {
        log::warn!("{}; logging to stderr only", e);
    }
    log::debug!("Logging initialized with level: {:?}", config.level);
    Ok(())
}

/// Pick the sink for log lines. A log file that cannot be opened degrades to
/// stderr; the error is handed back so it can be logged once the logger is up.
fn log_target(file_path: Option<&Path>) -> (Target, Option<Error>) {
    match file_path {
        Some(path) => match open_append(path) {
            Ok(file) => (Target::Pipe(Box::new(TeeWriter { file })), None),
            Err(e) => (Target::Stderr, Some(e)),
        },
        None => (Target::Stderr, None),
    }
}

/// Open a log file for appending, creating parent directories.
fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::DirectoryAccess {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::ConfigLoad(format!("Failed to open log file {:?}: {}", path, e)))
}

/// Writes every log line to stderr and to the log file.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The console copy is best effort; the file is the durable record.
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}
