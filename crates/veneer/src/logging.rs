use crate::error::VeneerError;
use veneer_domain::config::LogConfig;
use veneer_domain::constants::DEFAULT_NAMESPACE;
use veneer_logger::{FileOutput, LevelFilter, Logger, LoggerError};

/// Installs the global subscriber described by `config`.
///
/// Keep the returned [`Logger`] alive for as long as file output should be flushed.
///
/// # Errors
/// Returns [`VeneerError::Logger`] for an unknown level, invalid directives, an unusable
/// log directory, or when a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<Logger, VeneerError> {
    let level: LevelFilter = config.level.parse().map_err(|_| LoggerError::InvalidConfiguration {
        message: format!("unknown level '{}'", config.level).into(),
        context: None,
    })?;

    let mut builder = Logger::builder().console(config.console).level(level);
    if let Some(directives) = &config.directives {
        builder = builder.directives(directives.clone());
    }
    if let Some(dir) = &config.dir {
        let output = FileOutput::new(dir).prefix(DEFAULT_NAMESPACE);
        builder = builder.file(if config.json { output.json() } else { output });
    }

    Ok(builder.install()?)
}
