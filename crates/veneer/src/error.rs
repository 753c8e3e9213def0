use std::borrow::Cow;

/// Errors raised while assembling a [`Runtime`](crate::Runtime).
///
/// Once a runtime exists its operations no longer fail; see the crate docs.
#[veneer_derive::veneer_error]
pub enum VeneerError {
    #[error("Storage setup failed{}: {source}", format_context(.context))]
    Storage { source: veneer_storage::StorageError, context: Option<Cow<'static, str>> },

    #[error("Event bus setup failed{}: {source}", format_context(.context))]
    Bus { source: veneer_event_bus::EventBusError, context: Option<Cow<'static, str>> },

    #[error("Configuration failed{}: {source}", format_context(.context))]
    Config { source: veneer_kernel::config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Logger setup failed{}: {source}", format_context(.context))]
    Logger { source: veneer_logger::LoggerError, context: Option<Cow<'static, str>> },
}
