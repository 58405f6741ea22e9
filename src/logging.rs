//! Host plugin log protocol.
//!
//! The host reads a plugin's stderr line by line. A line of the form
//! `\x01<level>\x02<message>` is filed under that level (`t`race, `d`ebug,
//! `i`nfo, `w`arning, `e`rror); `p` lines carry a progress fraction.
//! [`PluginLogger`] is a [`log::Log`] sink speaking that protocol, and
//! [`StashProgress`] forwards capture progress the same way.

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::Mutex,
};

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::{
    config::CaptureConfig,
    progress::{ProgressCallback, ProgressInfo},
};

const START_OF_HEADING: char = '\u{1}';
const START_OF_TEXT: char = '\u{2}';

/// Protocol character for a log level.
pub fn level_char(level: Level) -> char {
    match level {
        Level::Trace => 't',
        Level::Debug => 'd',
        Level::Info => 'i',
        Level::Warn => 'w',
        Level::Error => 'e',
    }
}

/// Format `message` as protocol lines, one per physical line.
pub fn format_line(level_char: char, message: &str) -> String {
    let mut formatted = String::with_capacity(message.len() + 4);
    for line in message.lines() {
        formatted.push(START_OF_HEADING);
        formatted.push(level_char);
        formatted.push(START_OF_TEXT);
        formatted.push_str(line);
        formatted.push('\n');
    }
    if formatted.is_empty() {
        formatted.extend([START_OF_HEADING, level_char, START_OF_TEXT, '\n']);
    }
    formatted
}

/// A [`log::Log`] writing host protocol lines to stderr.
///
/// Records from this crate are emitted down to the configured level; records
/// from dependencies only at warning and above.
#[derive(Debug)]
pub struct PluginLogger {
    level: LevelFilter,
    file: Option<Mutex<File>>,
}

impl PluginLogger {
    /// A logger emitting records up to `level`.
    pub fn new(level: LevelFilter) -> Self {
        Self { level, file: None }
    }

    /// Build the logger described by `config`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the configured log file cannot be created.
    pub fn from_config(config: &CaptureConfig) -> io::Result<Self> {
        let logger = Self::new(config.log_level());
        match config.log_file() {
            Some(path) => logger.with_log_file(path),
            None => Ok(logger),
        }
    }

    /// Also append every emitted line to `path`, truncating it first.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be created.
    pub fn with_log_file(mut self, path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        self.file = Some(Mutex::new(file));
        Ok(self)
    }

    /// Install as the global `log` sink.
    ///
    /// # Errors
    ///
    /// Fails if a logger was already installed.
    pub fn install(self) -> Result<(), SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for PluginLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let own = metadata.target().starts_with(env!("CARGO_CRATE_NAME"));
        metadata.level() <= self.level && (own || metadata.level() <= Level::Warn)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        let line = format_line(level_char(record.level()), &message);
        let _ = io::stderr().lock().write_all(line.as_bytes());

        if let Some(Ok(mut file)) = self.file.as_ref().map(Mutex::lock) {
            let _ = writeln!(file, "{:<5} {message}", record.level());
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Some(Ok(mut file)) = self.file.as_ref().map(Mutex::lock) {
            let _ = file.flush();
        }
    }
}

/// Forwards capture progress to the host as `p` lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct StashProgress;

impl ProgressCallback for StashProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let line = format_line('p', &format!("{:.2}", info.fraction));
        let _ = io::stderr().lock().write_all(line.as_bytes());
    }
}
