//! # Logger
//!
//! Installs the process-wide `tracing` subscriber that renders what the runtime crates log.
//! Three sinks can be combined, and at least one must be enabled:
//!
//! * the terminal, compact and colored,
//! * rolling files under a directory, as text or JSON lines ([`FileOutput`]),
//! * an in-memory [`LogCapture`] that tests read back.
//!
//! Filtering starts from a minimum [`LevelFilter`]. Extra directives such as
//! `veneer_modules=debug` can be given explicitly; otherwise `RUST_LOG` is honored.
//!
//! ```rust
//! use veneer_logger::{LevelFilter, Logger};
//!
//! let _logger = Logger::builder().level(LevelFilter::DEBUG).install().unwrap();
//! tracing::debug!(module = "Widget", "Booting module");
//! ```

mod capture;
mod error;

pub use crate::capture::{CaptureWriter, LogCapture};
pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Rolling log files written through a background worker.
#[derive(Debug, Clone)]
pub struct FileOutput {
    dir: PathBuf,
    prefix: String,
    rotation: Rotation,
    keep: usize,
    json: bool,
}

impl FileOutput {
    /// Daily `veneer.<date>.log` files in `dir`, ten kept, plain text.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), prefix: "veneer".to_owned(), rotation: Rotation::DAILY, keep: 10, json: false }
    }

    #[must_use = "Sets the file name prefix"]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use = "Sets how often a new file is started"]
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use = "Sets how many rotated files are kept"]
    pub const fn keep(mut self, files: usize) -> Self {
        self.keep = files;
        self
    }

    /// One JSON object per event instead of text lines.
    #[must_use = "Switches the files to JSON lines"]
    pub const fn json(mut self) -> Self {
        self.json = true;
        self
    }

    fn open(self) -> Result<(NonBlocking, WorkerGuard), LoggerError> {
        if self.prefix.trim().is_empty() || self.keep == 0 {
            return Err(LoggerError::InvalidConfiguration {
                message: format!("prefix '{}' keeping {} files", self.prefix, self.keep).into(),
                context: Some("File output needs a prefix and at least one file".into()),
            });
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| LoggerError::Internal {
            message: e.to_string().into(),
            context: Some(format!("Creating log directory {}", self.dir.display()).into()),
        })?;

        let appender = RollingFileAppender::builder()
            .rotation(self.rotation)
            .filename_prefix(self.prefix)
            .filename_suffix("log")
            .max_log_files(self.keep)
            .build(&self.dir)?;
        Ok(tracing_appender::non_blocking(appender))
    }
}

/// Collects the sinks and filter, then installs them once with [`install`](Self::install).
#[derive(Debug)]
pub struct LoggerBuilder {
    level: LevelFilter,
    directives: Option<String>,
    console: bool,
    file: Option<FileOutput>,
    capture: Option<LogCapture>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self { level: LevelFilter::INFO, directives: None, console: true, file: None, capture: None }
    }
}

impl LoggerBuilder {
    #[must_use = "Sets the minimum level"]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// `EnvFilter` directives used instead of `RUST_LOG`.
    #[must_use = "Sets explicit filter directives"]
    pub fn directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = Some(directives.into());
        self
    }

    #[must_use = "Toggles terminal output"]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    #[must_use = "Adds rolling file output"]
    pub fn file(mut self, output: FileOutput) -> Self {
        self.file = Some(output);
        self
    }

    /// Copies every event into `capture`, without ANSI colors.
    #[must_use = "Adds an in-memory sink"]
    pub fn capture(mut self, capture: LogCapture) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Installs the global subscriber.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] when no sink is enabled, the directives do not
    ///   parse, or the file output has no prefix or keeps no files.
    /// * [`LoggerError::Internal`] or [`LoggerError::Appender`] when the log directory is
    ///   unusable.
    /// * [`LoggerError::Subscriber`] when a global subscriber is already installed.
    pub fn install(self) -> Result<Logger, LoggerError> {
        if !self.console && self.file.is_none() && self.capture.is_none() {
            return Err(LoggerError::InvalidConfiguration {
                message: "no sink enabled".into(),
                context: Some("Enable the console, a file output or a capture".into()),
            });
        }
        let filter = self.filter()?;

        let (file_writer, guard, json) = match self.file {
            Some(output) => {
                let json = output.json;
                let (writer, guard) = output.open()?;
                (Some(writer), Some(guard), json)
            },
            None => (None, None, false),
        };

        let console = self.console.then(|| fmt::layer().compact());
        let capture = self.capture.map(|sink| fmt::layer().with_writer(sink).with_ansi(false));
        let text_file = file_writer
            .clone()
            .filter(|_| !json)
            .map(|writer| fmt::layer().with_writer(writer).with_ansi(false));
        let json_file =
            file_writer.filter(|_| json).map(|writer| fmt::layer().json().with_writer(writer));

        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(capture)
            .with(text_file)
            .with(json_file)
            .try_init()?;

        Ok(Logger { flush_guard: guard })
    }

    fn filter(&self) -> Result<EnvFilter, LoggerError> {
        let base = EnvFilter::builder().with_default_directive(self.level.into());
        let Some(directives) = &self.directives else {
            return Ok(base.from_env_lossy());
        };
        base.parse(directives).map_err(|e| LoggerError::InvalidConfiguration {
            message: e.to_string().into(),
            context: Some(format!("Directives '{directives}'").into()),
        })
    }
}

/// Keeps file output flushing. Dropping it flushes and stops the background writer.
#[must_use = "File output stops when the logger handle is dropped"]
#[derive(Debug)]
pub struct Logger {
    flush_guard: Option<WorkerGuard>,
}

impl Logger {
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// Whether a file output is attached.
    #[must_use]
    pub const fn writes_files(&self) -> bool {
        self.flush_guard.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_write_info_to_the_console() {
        let builder = Logger::builder();
        assert!(builder.console);
        assert_eq!(builder.level, LevelFilter::INFO);
        assert!(builder.file.is_none() && builder.capture.is_none());
    }

    #[test]
    fn file_output_keeps_its_settings() {
        let output = FileOutput::new("/tmp/veneer-logs").prefix("host").keep(3).json();
        assert_eq!(output.prefix, "host");
        assert_eq!(output.keep, 3);
        assert!(output.json);
    }

    #[test]
    fn bad_directives_are_rejected() {
        let err = Logger::builder().directives("veneer=[").filter().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn nothing_enabled_is_rejected_before_install() {
        let err = Logger::builder().console(false).install().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn file_output_without_files_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileOutput::new(dir.path()).keep(0).open().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }
}
