use std::borrow::Cow;

/// Errors that can occur during event bus operations.
#[veneer_derive::veneer_error]
pub enum EventBusError {
    /// Capacity must be greater than zero for the tap channel.
    #[error("Invalid capacity{}: {message}", format_context(.context))]
    InvalidCapacity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The native channel no longer accepts broadcasts or listeners.
    #[error("Native channel closed{}: {message}", format_context(.context))]
    ChannelClosed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The native channel rejected a broadcast.
    #[error("Native dispatch failed{}: {message}", format_context(.context))]
    Dispatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A native channel was already bridged onto this bus.
    #[error("Native channel already bridged{}: {message}", format_context(.context))]
    AlreadyBridged { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
