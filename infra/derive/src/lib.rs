#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the Veneer workspace.
//!
//! Only one macro lives here for now: [`macro@veneer_error`], which every crate uses to
//! declare its error enum. Failures inside the reactive core (persistence, module
//! lifecycle, watchers) are swallowed at their boundary, so these enums mostly show up
//! on constructors and loaders: the file backend, the config loader, the logger and the
//! native relay channel.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! veneer-derive = { path = "../infra/derive" }
//! thiserror = "2"
//! ```

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Turns a plain enum into a workspace error type.
///
/// # Generated items
///
/// * `#[derive(Debug, thiserror::Error)]` unless already derived.
/// * A companion `<Name>Ext<T>` trait with `.context(...)`, implemented for
///   `Result<T, Name>` and for `Result<T, Source>` of every variant that wraps a source.
/// * `From<Source>` for variants with a `source` field (or a `#[source]`/`#[from]` field).
/// * `From<&'static str>` and `From<String>` when an `Internal` variant exists.
/// * A private `format_context` helper used by the `#[error(...)]` strings.
///
/// # Requirements
///
/// 1. Only enums are accepted.
/// 2. Every variant has named fields; tuple and unit variants are rejected.
/// 3. A `context` field, when present, must be `Option<Cow<'static, str>>`.
/// 4. A variant that wraps a source must also carry a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[veneer_derive::veneer_error]
/// pub enum StoreError {
///     #[error("Backend I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal store error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load(path: &std::path::Path) -> Result<Vec<u8>, StoreError> {
///     std::fs::read(path).context("Reading flag snapshot")
/// }
/// ```
#[proc_macro_attribute]
pub fn veneer_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
